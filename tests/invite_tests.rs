//! Tests for the invite flow: candidate filtering, debounced search, membership patch

#[cfg(test)]
fn user(id: i64, name: &str) -> roomchat::models::User {
    roomchat::models::User {
        id,
        username: name.to_string(),
        avatar: None,
        email: None,
    }
}

#[cfg(test)]
fn team_room() -> roomchat::models::Room {
    roomchat::models::Room {
        id: 3,
        name: "Team".to_string(),
        description: None,
        participants: vec![1, 2],
    }
}

#[cfg(test)]
mod filtering {
    use super::user;
    use roomchat::invite::filter_candidates;

    #[test]
    fn excludes_current_participants() {
        let users = vec![user(1, "ann"), user(3, "anna"), user(4, "joanne")];
        let names: Vec<String> = filter_candidates(users, "ann", &[1])
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["anna", "joanne"]);
    }

    #[test]
    fn matches_case_insensitively() {
        let users = vec![user(3, "AnnaBelle"), user(4, "bob")];
        let found = filter_candidates(users, "aNNa", &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
    }

    #[test]
    fn drops_server_results_that_do_not_match() {
        let users = vec![user(5, "carl")];
        assert!(filter_candidates(users, "ann", &[]).is_empty());
    }
}

#[cfg(test)]
mod dialog_state {
    use super::{team_room, user};
    use roomchat::invite::{InviteDialog, DEFAULT_SEARCH_DELAY};

    #[tokio::test]
    async fn results_for_outdated_query_are_dropped() {
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.query.set("ann");
        dialog.on_query_changed();
        assert!(!dialog.apply_results("an", vec![user(3, "anna")]));
        assert!(dialog.candidates.is_empty());
        assert!(dialog.apply_results("ann", vec![user(3, "anna"), user(1, "ann")]));
        assert_eq!(dialog.candidates.len(), 1);
        assert_eq!(dialog.candidates[0].id, 3);
    }

    #[tokio::test]
    async fn selecting_moves_candidate_out_of_results() {
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.query.set("a");
        dialog.apply_results("a", vec![user(3, "anna"), user(4, "carla")]);
        dialog.highlight_next();
        assert_eq!(dialog.select_highlighted().map(|u| u.id), Some(4));
        assert!(dialog.is_selected(4));
        assert_eq!(dialog.candidates.len(), 1);
        assert_eq!(dialog.highlighted, 0);

        // A repeat search does not offer the selected user again
        dialog.apply_results("a", vec![user(3, "anna"), user(4, "carla")]);
        assert_eq!(dialog.candidates.len(), 1);
    }

    #[test]
    fn new_participants_is_union_in_order() {
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.selected = vec![user(5, "eve"), user(2, "bob")];
        assert_eq!(dialog.new_participants(&[1, 2]), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn cancel_resets_everything() {
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.query.set("ann");
        dialog.on_query_changed();
        dialog.selected.push(user(9, "zed"));
        dialog.cancel();
        assert!(dialog.query.is_empty());
        assert!(dialog.selected.is_empty());
        assert!(!dialog.searching);
    }
}

#[cfg(test)]
mod debounced_search {
    use super::team_room;
    use httpmock::prelude::*;
    use roomchat::client::ChatClient;
    use roomchat::invite::{self, InviteDialog};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn only_final_query_fires() {
        let mut dialog = InviteDialog::for_room(&team_room(), Duration::from_millis(300));
        for c in "ann".chars() {
            dialog.query.insert_char(c);
            dialog.on_query_changed();
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(dialog.poll_fired(), None);
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(dialog.poll_fired().as_deref(), Some("ann"));
        assert!(dialog.searching);
        assert_eq!(dialog.poll_fired(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_query_cancels_pending_search() {
        let mut dialog = InviteDialog::for_room(&team_room(), Duration::from_millis(300));
        dialog.query.set("an");
        dialog.on_query_changed();
        dialog.query.clear();
        dialog.on_query_changed();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(dialog.poll_fired(), None);
    }

    #[tokio::test]
    async fn rapid_typing_makes_one_request() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/users/").query_param("search", "ann");
                then.status(200).json_body(json!([
                    {"id": 1, "username": "ann"},
                    {"id": 7, "username": "Annika"}
                ]));
            })
            .await;
        let client = ChatClient::new(&server.url("/api/"), None);
        let mut dialog = InviteDialog::for_room(&team_room(), Duration::from_millis(50));

        for c in "ann".chars() {
            dialog.query.insert_char(c);
            dialog.on_query_changed();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        let query = dialog.poll_fired().expect("search should fire");
        let users = invite::search_candidates(&client, &query, &dialog.participants)
            .await
            .unwrap();
        dialog.apply_results(&query, users);

        assert_eq!(search.hits_async().await, 1);
        let names: Vec<&str> = dialog.candidates.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["Annika"]);
    }
}

#[cfg(test)]
mod inviting {
    use super::{team_room, user};
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use roomchat::client::ChatClient;
    use roomchat::directory::RoomDirectory;
    use roomchat::invite::{self, InviteDialog, DEFAULT_SEARCH_DELAY};
    use serde_json::json;

    #[tokio::test]
    async fn invite_patches_full_participant_list() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/api/rooms/3/")
                    .json_body(json!({"participants": [1, 2, 7]}));
                then.status(200).json_body(
                    json!({"id": 3, "name": "Team", "participants": [1, 2, 7]}),
                );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/rooms/");
                then.status(200).json_body(json!([
                    {"id": 3, "name": "Team", "participants": [1, 2, 7]}
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/users/").query_param("ids", "1,2,7");
                then.status(200).json_body(json!([
                    {"id": 1, "username": "ann"},
                    {"id": 2, "username": "bob"},
                    {"id": 7, "username": "Annika"}
                ]));
            })
            .await;
        let client = ChatClient::new(&server.url("/api/"), None);
        let directory = RoomDirectory::new();
        directory.apply_rooms(vec![team_room()]);
        directory.set_selected_room_id(Some(3));
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.selected.push(user(7, "Annika"));

        let committed = invite::invite_members(&client, &directory, &mut dialog)
            .await
            .unwrap();

        patch.assert_async().await;
        assert!(committed.refresh_error.is_none());
        assert!(dialog.selected.is_empty());
        assert_eq!(directory.members().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_invite_sends_nothing() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH).path("/api/rooms/3/");
                then.status(200);
            })
            .await;
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.selected.push(user(7, "Annika"));
        dialog.cancel();
        drop(dialog);

        assert_eq!(patch.hits_async().await, 0);
    }

    #[tokio::test]
    async fn failed_patch_keeps_selection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PATCH).path("/api/rooms/3/");
                then.status(403).body("forbidden");
            })
            .await;
        let client = ChatClient::new(&server.url("/api/"), None);
        let directory = RoomDirectory::new();
        directory.apply_rooms(vec![team_room()]);
        directory.set_selected_room_id(Some(3));
        let mut dialog = InviteDialog::for_room(&team_room(), DEFAULT_SEARCH_DELAY);
        dialog.selected.push(user(7, "Annika"));

        let err = invite::invite_members(&client, &directory, &mut dialog)
            .await
            .unwrap_err();

        assert!(err.is_request_error());
        assert_eq!(dialog.selected.len(), 1);
    }
}

#[cfg(test)]
mod debouncer {
    use roomchat::debounce::Debouncer;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn delivers_after_delay() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(1);
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_restarts_window() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule("a");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule("ab");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().ok(), Some("ab"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_delivers_nothing() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule(7);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_timer() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule(7);
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.recv().await, None);
    }
}

//! Tests for the app module: panels, room selection, notices, dialogs, input editing

#[cfg(test)]
fn test_app() -> (roomchat::app::App, tempfile::TempDir) {
    use roomchat::config::Config;
    use roomchat::session::{Session, SessionStore};

    let dir = tempfile::tempdir().unwrap();
    let session = Session::rehydrate(SessionStore::new(dir.path().join("session.json")));
    (roomchat::app::App::new(session, &Config::default()), dir)
}

#[cfg(test)]
fn make_rooms(count: i64) -> Vec<roomchat::models::Room> {
    (1..=count)
        .map(|i| roomchat::models::Room {
            id: i,
            name: format!("Room {}", i),
            description: None,
            participants: vec![1],
        })
        .collect()
}

#[cfg(test)]
mod panel_navigation {
    use super::test_app;
    use roomchat::app::Panel;

    #[test]
    fn new_app_starts_on_room_list() {
        let (app, _dir) = test_app();
        assert_eq!(app.active_panel, Panel::RoomList);
    }

    #[test]
    fn next_panel_cycles_forward() {
        let (mut app, _dir) = test_app();
        app.next_panel();
        assert_eq!(app.active_panel, Panel::Messages);
        app.next_panel();
        assert_eq!(app.active_panel, Panel::Input);
        app.next_panel();
        assert_eq!(app.active_panel, Panel::RoomList);
    }

    #[test]
    fn prev_panel_cycles_backward() {
        let (mut app, _dir) = test_app();
        app.prev_panel();
        assert_eq!(app.active_panel, Panel::Input);
        app.prev_panel();
        assert_eq!(app.active_panel, Panel::Messages);
        app.prev_panel();
        assert_eq!(app.active_panel, Panel::RoomList);
    }
}

#[cfg(test)]
mod room_selection {
    use super::{make_rooms, test_app};

    #[test]
    fn select_next_room_starts_at_first() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(3));
        app.select_next_room();
        assert_eq!(app.directory.selected_room_id(), Some(1));
        app.select_next_room();
        assert_eq!(app.directory.selected_room_id(), Some(2));
    }

    #[test]
    fn select_next_room_stops_at_end() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(3));
        app.select_room(Some(3));
        app.select_next_room();
        assert_eq!(app.directory.selected_room_id(), Some(3));
    }

    #[test]
    fn select_prev_room_stops_at_first() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(3));
        app.select_room(Some(2));
        app.select_prev_room();
        app.select_prev_room();
        assert_eq!(app.directory.selected_room_id(), Some(1));
    }

    #[test]
    fn select_noop_when_no_rooms() {
        let (mut app, _dir) = test_app();
        app.select_next_room();
        assert_eq!(app.directory.selected_room_id(), None);
    }

    #[test]
    fn selected_room_name_fallback() {
        let (app, _dir) = test_app();
        assert_eq!(app.selected_room_name(), "No room selected");
    }

    #[test]
    fn selected_room_name_returns_name() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(2));
        app.select_room(Some(2));
        assert_eq!(app.selected_room_name(), "Room 2");
    }

    #[test]
    fn filter_matches_name_case_insensitively() {
        let (mut app, _dir) = test_app();
        let mut rooms = make_rooms(2);
        rooms[1].name = "Team Sync".to_string();
        app.directory.apply_rooms(rooms);
        app.room_filter.set("team");
        let names: Vec<String> = app.filtered_rooms().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Team Sync"]);
    }

    #[test]
    fn navigation_follows_filtered_list() {
        let (mut app, _dir) = test_app();
        let mut rooms = make_rooms(3);
        rooms[2].name = "Other".to_string();
        app.directory.apply_rooms(rooms);
        app.room_filter.set("other");
        app.select_next_room();
        assert_eq!(app.directory.selected_room_id(), Some(3));
    }
}

#[cfg(test)]
mod thread_sync {
    use super::{make_rooms, test_app};

    #[test]
    fn selecting_a_room_requests_a_load_once() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(2));
        app.select_room(Some(2));
        let ticket = app.sync_thread().expect("load should start");
        assert_eq!(ticket.room_id, 2);
        assert!(app.thread.is_loading());
        assert!(app.sync_thread().is_none());
    }

    #[test]
    fn clearing_the_selection_empties_the_thread() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(2));
        app.select_room(Some(1));
        app.sync_thread();
        app.select_room(None);
        assert!(app.sync_thread().is_none());
        assert_eq!(app.thread.room_id(), None);
        assert!(app.thread.entries().is_empty());
    }

    #[test]
    fn reload_issues_a_fresh_ticket() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(1));
        app.select_room(Some(1));
        let first = app.sync_thread().unwrap();
        let second = app.reload_thread().unwrap();
        assert_ne!(first, second);
        assert!(!app.thread.apply_load(first, Vec::new()));
        assert!(app.thread.apply_load(second, Vec::new()));
    }
}

#[cfg(test)]
mod notices {
    use super::test_app;
    use roomchat::app::NoticeLevel;
    use roomchat::ChatError;
    use std::time::Duration;

    #[test]
    fn notify_sets_active_notice() {
        let (mut app, _dir) = test_app();
        app.notify(NoticeLevel::Success, "Room created");
        let notice = app.active_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.text, "Room created");
    }

    #[test]
    fn notify_error_includes_context() {
        let (mut app, _dir) = test_app();
        app.notify_error("Send failed", &ChatError::validation("boom"));
        let notice = app.active_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.text.starts_with("Send failed: "));
        assert!(notice.text.contains("boom"));
    }

    #[test]
    fn expired_notice_is_dropped() {
        let (mut app, _dir) = test_app();
        app.notice_duration = Duration::ZERO;
        app.notify(NoticeLevel::Info, "gone");
        assert!(app.active_notice().is_none());
        app.expire_notice();
        assert!(app.notice.is_none());
    }
}

#[cfg(test)]
mod dialogs {
    use super::{make_rooms, test_app};
    use roomchat::app::Dialog;
    use roomchat::models::User;

    #[test]
    fn room_dialogs_need_a_selection() {
        let (mut app, _dir) = test_app();
        assert!(app.open_rename().unwrap_err().is_validation());
        assert!(app.open_delete().unwrap_err().is_validation());
        assert!(app.open_attach().unwrap_err().is_validation());
        assert!(app.dialog.is_none());
    }

    #[test]
    fn rename_dialog_is_prefilled() {
        let (mut app, _dir) = test_app();
        let mut rooms = make_rooms(1);
        rooms[0].description = Some("weekly".to_string());
        app.directory.apply_rooms(rooms);
        app.select_room(Some(1));
        app.open_rename().unwrap();
        match app.dialog {
            Some(Dialog::Rename(ref d)) => {
                assert_eq!(d.room_id, 1);
                assert_eq!(d.form.name.as_str(), "Room 1");
                assert_eq!(d.form.description.as_str(), "weekly");
            }
            _ => panic!("expected rename dialog"),
        }
    }

    #[test]
    fn invite_dialog_snapshots_participants() {
        let (mut app, _dir) = test_app();
        app.directory.apply_rooms(make_rooms(1));
        app.select_room(Some(1));
        app.open_invite().unwrap();
        match app.dialog {
            Some(Dialog::Invite(ref d)) => assert_eq!(d.participants, vec![1]),
            _ => panic!("expected invite dialog"),
        }
        app.close_dialog();
        assert!(app.dialog.is_none());
    }

    #[test]
    fn profile_dialog_needs_a_user() {
        let (mut app, _dir) = test_app();
        assert!(app.open_profile().is_err());
        app.session
            .sign_in(User {
                id: 7,
                username: "ann".to_string(),
                avatar: None,
                email: None,
            })
            .unwrap();
        app.open_profile().unwrap();
        match app.dialog {
            Some(Dialog::Profile(ref d)) => assert_eq!(d.username.as_str(), "ann"),
            _ => panic!("expected profile dialog"),
        }
    }
}

#[cfg(test)]
mod sign_out {
    use super::{make_rooms, test_app};
    use roomchat::models::{Attachment, User};

    #[test]
    fn sign_out_clears_everything() {
        let (mut app, dir) = test_app();
        app.session
            .sign_in(User {
                id: 1,
                username: "ann".to_string(),
                avatar: None,
                email: None,
            })
            .unwrap();
        app.directory.apply_rooms(make_rooms(2));
        app.select_room(Some(1));
        app.sync_thread();
        app.composer.text.set("draft");
        app.composer.attach(Attachment::new("a.txt", b"x".to_vec()));
        app.room_filter.set("room");

        app.sign_out().unwrap();

        assert!(!app.session.is_logged_in());
        assert!(app.current_user().is_none());
        assert!(app.directory.rooms().is_empty());
        assert_eq!(app.directory.selected_room_id(), None);
        assert_eq!(app.thread.room_id(), None);
        assert!(app.composer.text.is_empty());
        assert!(app.composer.file.is_none());
        assert!(app.room_filter.is_empty());
        assert!(!dir.path().join("session.json").exists());
    }
}

#[cfg(test)]
mod input_handling {
    use roomchat::input::TextInput;

    #[test]
    fn insert_char_basic() {
        let mut input = TextInput::new();
        input.insert_char('h');
        input.insert_char('i');
        assert_eq!(input.as_str(), "hi");
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn insert_char_unicode() {
        let mut input = TextInput::new();
        input.insert_char('🎉');
        assert_eq!(input.as_str(), "🎉");
        assert_eq!(input.cursor, 4); // UTF-8 length of emoji
        assert_eq!(input.cursor_column(), 1);
    }

    #[test]
    fn delete_char_removes_last() {
        let mut input = TextInput::with_value("abc");
        input.delete_char();
        assert_eq!(input.as_str(), "ab");
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn delete_char_noop_when_empty() {
        let mut input = TextInput::new();
        input.delete_char();
        assert_eq!(input.as_str(), "");
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn delete_char_unicode() {
        let mut input = TextInput::new();
        input.insert_char('a');
        input.insert_char('é');
        input.delete_char();
        assert_eq!(input.as_str(), "a");
    }

    #[test]
    fn take_clears_state() {
        let mut input = TextInput::with_value("test");
        assert_eq!(input.take(), "test");
        assert_eq!(input.as_str(), "");
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn cursor_movement_left_stops_at_zero() {
        let mut input = TextInput::with_value("ab");
        input.move_cursor_left();
        assert_eq!(input.cursor, 1);
        input.move_cursor_left();
        input.move_cursor_left();
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn cursor_movement_right_stops_at_end() {
        let mut input = TextInput::with_value("a");
        input.move_cursor_left();
        input.move_cursor_right();
        input.move_cursor_right();
        assert_eq!(input.cursor, 1);
    }

    #[test]
    fn insert_at_cursor_middle() {
        let mut input = TextInput::with_value("ac");
        input.move_cursor_left();
        input.insert_char('b');
        assert_eq!(input.as_str(), "abc");
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn blank_means_whitespace_only() {
        assert!(TextInput::with_value("   ").is_blank());
        assert!(!TextInput::with_value("   ").is_empty());
        assert!(!TextInput::with_value(" x ").is_blank());
    }
}

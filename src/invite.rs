use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::debounce::Debouncer;
use crate::directory::{Committed, RoomDirectory};
use crate::error::Result;
use crate::input::TextInput;
use crate::models::{Room, RoomId, RoomPatch, User, UserId};

pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(300);

/// Drops current participants and users whose name does not contain the
/// query (case-insensitive), whatever the server returned.
pub fn filter_candidates(users: Vec<User>, query: &str, participants: &[UserId]) -> Vec<User> {
    let existing: HashSet<UserId> = participants.iter().copied().collect();
    let needle = query.to_lowercase();
    users
        .into_iter()
        .filter(|u| !existing.contains(&u.id))
        .filter(|u| u.username.to_lowercase().contains(&needle))
        .collect()
}

pub async fn search_candidates(
    client: &ChatClient,
    query: &str,
    participants: &[UserId],
) -> Result<Vec<User>> {
    let users = client.search_users(query).await?;
    Ok(filter_candidates(users, query, participants))
}

pub struct InviteDialog {
    pub room_id: RoomId,
    pub participants: Vec<UserId>,
    pub query: TextInput,
    pub candidates: Vec<User>,
    pub highlighted: usize,
    pub selected: Vec<User>,
    pub searching: bool,
    debouncer: Debouncer<String>,
    fired: mpsc::UnboundedReceiver<String>,
}

impl InviteDialog {
    pub fn for_room(room: &Room, delay: Duration) -> Self {
        let (debouncer, fired) = Debouncer::new(delay);
        Self {
            room_id: room.id,
            participants: room.participants.clone(),
            query: TextInput::new(),
            candidates: Vec::new(),
            highlighted: 0,
            selected: Vec::new(),
            searching: false,
            debouncer,
            fired,
        }
    }

    /// Call after every edit of `query`. Restarts the debounce window.
    pub fn on_query_changed(&mut self) {
        self.candidates.clear();
        self.highlighted = 0;
        if self.query.is_blank() {
            self.debouncer.cancel();
            self.searching = false;
            return;
        }
        self.debouncer.schedule(self.query.as_str().to_string());
    }

    /// The query whose debounce window has elapsed, if any. Only that one
    /// should go out as a search request.
    pub fn poll_fired(&mut self) -> Option<String> {
        let mut last = None;
        while let Ok(query) = self.fired.try_recv() {
            last = Some(query);
        }
        let query = last.filter(|q| q == self.query.as_str())?;
        debug!(%query, "invite search fired");
        self.searching = true;
        Some(query)
    }

    /// Applies search results unless the user has typed on since.
    pub fn apply_results(&mut self, query: &str, users: Vec<User>) -> bool {
        if query != self.query.as_str() {
            debug!(%query, "discarding results for outdated query");
            return false;
        }
        self.searching = false;
        self.candidates = filter_candidates(users, query, &self.participants)
            .into_iter()
            .filter(|u| !self.is_selected(u.id))
            .collect();
        self.highlighted = 0;
        true
    }

    pub fn search_failed(&mut self, query: &str) {
        if query == self.query.as_str() {
            self.searching = false;
            self.candidates.clear();
        }
    }

    pub fn highlight_next(&mut self) {
        if !self.candidates.is_empty() {
            self.highlighted = (self.highlighted + 1).min(self.candidates.len() - 1);
        }
    }

    pub fn highlight_prev(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    /// Moves the highlighted candidate into the selection.
    pub fn select_highlighted(&mut self) -> Option<&User> {
        if self.highlighted >= self.candidates.len() {
            return None;
        }
        let user = self.candidates.remove(self.highlighted);
        if self.highlighted >= self.candidates.len() {
            self.highlighted = self.candidates.len().saturating_sub(1);
        }
        self.selected.push(user);
        self.selected.last()
    }

    pub fn unselect_last(&mut self) -> Option<User> {
        self.selected.pop()
    }

    pub fn is_selected(&self, user_id: UserId) -> bool {
        self.selected.iter().any(|u| u.id == user_id)
    }

    /// Current participants followed by the newly selected users.
    pub fn new_participants(&self, current: &[UserId]) -> Vec<UserId> {
        let mut ids = current.to_vec();
        for user in &self.selected {
            if !ids.contains(&user.id) {
                ids.push(user.id);
            }
        }
        ids
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
        self.query.clear();
        self.candidates.clear();
        self.selected.clear();
        self.searching = false;
    }
}

/// Replaces the room's participant set with the union of its current members
/// and the selection, then refreshes the directory.
pub async fn invite_members(
    client: &ChatClient,
    directory: &RoomDirectory,
    dialog: &mut InviteDialog,
) -> Result<Committed<Room>> {
    let current = directory
        .selected_room()
        .filter(|r| r.id == dialog.room_id)
        .map(|r| r.participants)
        .unwrap_or_else(|| dialog.participants.clone());
    let patch = RoomPatch {
        participants: Some(dialog.new_participants(&current)),
        ..RoomPatch::default()
    };
    let room = client.update_room(dialog.room_id, &patch).await?;
    info!(
        room_id = room.id,
        added = dialog.selected.len(),
        "members invited"
    );
    dialog.cancel();
    Ok(directory.refresh_after(client, room).await)
}

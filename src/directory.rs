//! Room directory: the cached room list, the open room, and its members.
//!
//! State is held as immutable snapshots. Every mutation builds a new
//! [`DirectoryState`] and publishes it through a `watch` channel, so readers
//! holding an older `Arc` keep a consistent view.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::models::{Room, RoomId, User};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    pub rooms: Vec<Room>,
    pub selected_room_id: Option<RoomId>,
    pub members: Vec<User>,
}

impl DirectoryState {
    pub fn selected_room(&self) -> Option<&Room> {
        let id = self.selected_room_id?;
        self.rooms.iter().find(|r| r.id == id)
    }

    fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.iter().any(|r| r.id == room_id)
    }

    /// Drops a selection whose room is no longer listed.
    fn reconciled(mut self) -> Self {
        if let Some(id) = self.selected_room_id {
            if !self.contains(id) {
                info!(room_id = id, "selected room disappeared, clearing selection");
                self.selected_room_id = None;
                self.members.clear();
            }
        }
        self
    }
}

/// A mutation the server accepted, and how the directory refresh after it went.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub refresh_error: Option<ChatError>,
}

pub struct RoomDirectory {
    state: watch::Sender<Arc<DirectoryState>>,
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomDirectory {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(DirectoryState::default()));
        Self { state }
    }

    pub fn snapshot(&self) -> Arc<DirectoryState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DirectoryState>> {
        self.state.subscribe()
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.state.borrow().rooms.clone()
    }

    pub fn selected_room_id(&self) -> Option<RoomId> {
        self.state.borrow().selected_room_id
    }

    pub fn selected_room(&self) -> Option<Room> {
        self.state.borrow().selected_room().cloned()
    }

    pub fn members(&self) -> Vec<User> {
        self.state.borrow().members.clone()
    }

    /// Replaces the room list with the server's and resolves the open room's
    /// members. Nothing is published until both requests succeed, so on
    /// failure the previous snapshot stays in place.
    pub async fn fetch_rooms(&self, client: &ChatClient) -> Result<()> {
        let rooms = client.list_rooms().await.inspect_err(|e| {
            warn!("Room refresh failed: {}", e);
        })?;
        let next = self.reconcile(rooms);
        let members = match next.selected_room() {
            Some(room) => client
                .users_by_ids(&room.participants)
                .await
                .inspect_err(|e| warn!("Member lookup failed: {}", e))?,
            None => Vec::new(),
        };
        info!(count = next.rooms.len(), "rooms refreshed");
        let current = self.snapshot();
        if current.selected_room_id != next.selected_room_id {
            // Selection moved while the requests were in flight.
            self.publish(
                DirectoryState {
                    rooms: next.rooms,
                    selected_room_id: current.selected_room_id,
                    members: Vec::new(),
                }
                .reconciled(),
            );
        } else {
            self.publish(DirectoryState { members, ..next });
        }
        Ok(())
    }

    /// Installs a fetched room list and returns the surviving selection.
    pub fn apply_rooms(&self, rooms: Vec<Room>) -> Option<RoomId> {
        let next = self.reconcile(rooms);
        let selected = next.selected_room_id;
        self.publish(next);
        selected
    }

    fn reconcile(&self, rooms: Vec<Room>) -> DirectoryState {
        let current = self.snapshot();
        DirectoryState {
            rooms,
            selected_room_id: current.selected_room_id,
            members: current.members.clone(),
        }
        .reconciled()
    }

    /// Selecting an id that is not in the cached list clears the selection.
    pub fn set_selected_room_id(&self, room_id: Option<RoomId>) {
        let current = self.snapshot();
        if current.selected_room_id == room_id {
            return;
        }
        let selected_room_id = match room_id {
            Some(id) if current.contains(id) => Some(id),
            Some(id) => {
                warn!(room_id = id, "ignoring selection of unknown room");
                None
            }
            None => None,
        };
        self.publish(DirectoryState {
            rooms: current.rooms.clone(),
            selected_room_id,
            members: Vec::new(),
        });
    }

    /// Resolves the selected room's participants to user records.
    pub async fn refresh_members(&self, client: &ChatClient) -> Result<()> {
        let Some(room) = self.selected_room() else {
            return Ok(());
        };
        let members = client.users_by_ids(&room.participants).await?;
        let current = self.snapshot();
        // Selection may have moved while the request was in flight.
        if current.selected_room_id != Some(room.id) {
            return Ok(());
        }
        self.publish(DirectoryState {
            rooms: current.rooms.clone(),
            selected_room_id: current.selected_room_id,
            members,
        });
        Ok(())
    }

    /// Refreshes after a successful mutation, carrying its result along.
    pub async fn refresh_after<T>(&self, client: &ChatClient, value: T) -> Committed<T> {
        let refresh_error = self.fetch_rooms(client).await.err();
        Committed {
            value,
            refresh_error,
        }
    }

    pub fn clear_state(&self) {
        info!("directory cleared");
        self.publish(DirectoryState::default());
    }

    fn publish(&self, next: DirectoryState) {
        self.state.send_replace(Arc::new(next));
    }
}

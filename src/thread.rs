//! The open room's message thread and the composer below it.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::input::TextInput;
use crate::models::*;

/// Stamp handed out when a thread load starts. A load result is only applied
/// if its ticket is still the newest one for the room being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub room_id: RoomId,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct ChatThread {
    room_id: Option<RoomId>,
    generation: u64,
    entries: Vec<ThreadEntry>,
    /// Messages appended while a load was in flight; the load may predate them.
    sent_during_load: Vec<ThreadEntry>,
    loading: bool,
    /// Lines scrolled up from the newest message; 0 is pinned to the bottom.
    pub scroll_offset: usize,
}

impl ChatThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_load(&mut self, room_id: RoomId) -> LoadTicket {
        if self.room_id != Some(room_id) {
            self.entries.clear();
        }
        self.room_id = Some(room_id);
        self.generation += 1;
        self.sent_during_load.clear();
        self.loading = true;
        LoadTicket {
            room_id,
            generation: self.generation,
        }
    }

    /// Nothing selected: empty the thread and invalidate loads in flight.
    pub fn clear(&mut self) {
        self.room_id = None;
        self.generation += 1;
        self.entries.clear();
        self.sent_during_load.clear();
        self.loading = false;
        self.scroll_offset = 0;
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.room_id == Some(ticket.room_id) && self.generation == ticket.generation
    }

    /// Returns false when the result was superseded and dropped.
    pub fn apply_load(&mut self, ticket: LoadTicket, entries: Vec<ThreadEntry>) -> bool {
        if !self.is_current(&ticket) {
            warn!(
                room_id = ticket.room_id,
                "discarding stale thread load for a room no longer shown"
            );
            return false;
        }
        info!(room_id = ticket.room_id, count = entries.len(), "thread loaded");
        let mut entries = entries;
        for sent in self.sent_during_load.drain(..) {
            if !entries.iter().any(|e| e.message.id == sent.message.id) {
                entries.push(sent);
            }
        }
        self.entries = entries;
        self.loading = false;
        self.scroll_to_newest();
        true
    }

    pub fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(&ticket) {
            return false;
        }
        self.sent_during_load.clear();
        self.loading = false;
        true
    }

    /// Appends a newly created message if it belongs to the room on screen.
    pub fn append(&mut self, entry: ThreadEntry) -> bool {
        if self.room_id != Some(entry.message.room) {
            debug!(room_id = entry.message.room, "not appending message for another room");
            return false;
        }
        if self.loading {
            self.sent_during_load.push(entry.clone());
        }
        self.entries.push(entry);
        self.scroll_to_newest();
        true
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn scroll_to_newest(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn newest_attachment(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|e| e.attachment())
    }
}

#[derive(Debug, Default)]
pub struct Composer {
    pub text: TextInput,
    pub file: Option<Attachment>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, file: Attachment) {
        self.file = Some(file);
    }

    pub fn detach(&mut self) {
        self.file = None;
    }

    pub fn file_label(&self) -> Option<String> {
        self.file.as_ref().map(|f| shorten_file_name(&f.file_name))
    }

    /// Builds the multipart payload; at least one of text or file is required.
    pub fn prepare(&self, room: RoomId, sender: UserId) -> Result<OutgoingMessage> {
        if self.text.is_empty() && self.file.is_none() {
            return Err(ChatError::validation(
                "Type a message or attach a file to send",
            ));
        }
        Ok(OutgoingMessage {
            content: self.text.as_str().to_string(),
            room,
            sender,
            file: self.file.clone(),
        })
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.file = None;
    }
}

/// Fetches a room's messages and decorates them with their senders, resolved
/// in a single batched user lookup.
pub async fn load_thread(client: &ChatClient, room_id: RoomId) -> Result<Vec<ThreadEntry>> {
    let messages = client.list_messages(room_id).await?;
    let sender_ids: Vec<UserId> = messages
        .iter()
        .map(|m| m.sender)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users = client.users_by_ids(&sender_ids).await?;
    Ok(decorate_messages(messages, &users))
}

pub fn decorate_messages(mut messages: Vec<Message>, users: &[User]) -> Vec<ThreadEntry> {
    let by_id: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
    if messages.iter().all(|m| m.created_at.is_some()) {
        messages.sort_by_key(|m| m.created_at);
    }
    messages
        .into_iter()
        .map(|m| {
            let sender = by_id.get(&m.sender).copied();
            ThreadEntry::decorate(m, sender)
        })
        .collect()
}

/// Sends the composer's contents to `room_id` as `sender`. On success the
/// echoed message joins the thread and the composer is emptied; on failure
/// both are left as they were.
pub async fn submit_message(
    client: &ChatClient,
    thread: &mut ChatThread,
    composer: &mut Composer,
    room_id: RoomId,
    sender: &User,
) -> Result<()> {
    let outgoing = composer.prepare(room_id, sender.id)?;
    let message = client.send_message(&outgoing).await?;
    info!(message_id = message.id, room_id, "message sent");
    thread.append(ThreadEntry::decorate(message, Some(sender)));
    composer.clear();
    Ok(())
}

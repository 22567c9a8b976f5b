use std::time::{Duration, Instant};

use crate::config::Config;
use crate::directory::RoomDirectory;
use crate::error::{ChatError, Result};
use crate::input::TextInput;
use crate::invite::InviteDialog;
use crate::models::{Room, RoomId, User, UserId};
use crate::profile::ProfileDialog;
use crate::rooms::{CreateRoomDialog, DeleteDialog, RenameDialog};
use crate::session::Session;
use crate::thread::{ChatThread, Composer, LoadTicket};

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    RoomList,
    Messages,
    Input,
}

#[derive(Debug, Clone)]
pub enum AppScreen {
    Loading { message: String },
    Main,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient status bar message.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub shown_at: Instant,
}

pub enum Dialog {
    CreateRoom(CreateRoomDialog),
    Rename(RenameDialog),
    Delete(DeleteDialog),
    Invite(Box<InviteDialog>),
    Profile(Box<ProfileDialog>),
    /// Path prompt for the composer's attachment.
    Attach(TextInput),
}

pub struct App {
    pub screen: AppScreen,
    pub active_panel: Panel,
    pub session: Session,
    pub directory: RoomDirectory,
    pub thread: ChatThread,
    pub composer: Composer,
    pub room_filter: TextInput,
    pub filtering: bool,
    pub dialog: Option<Dialog>,
    pub notice: Option<Notice>,
    pub notice_duration: Duration,
    pub search_delay: Duration,
}

impl App {
    pub fn new(session: Session, config: &Config) -> Self {
        Self {
            screen: AppScreen::Loading {
                message: "Starting...".to_string(),
            },
            active_panel: Panel::RoomList,
            session,
            directory: RoomDirectory::new(),
            thread: ChatThread::new(),
            composer: Composer::new(),
            room_filter: TextInput::new(),
            filtering: false,
            dialog: None,
            notice: None,
            notice_duration: config.notice_duration(),
            search_delay: config.search_delay(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.session.current_user_id()
    }

    // ---- Room list ----

    /// Rooms whose name contains the filter text, case-insensitively.
    pub fn filtered_rooms(&self) -> Vec<Room> {
        let needle = self.room_filter.as_str().to_lowercase();
        self.directory
            .rooms()
            .into_iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_room_name(&self) -> String {
        self.directory
            .selected_room()
            .map(|r| r.name)
            .unwrap_or_else(|| "No room selected".to_string())
    }

    fn select_relative(&mut self, forward: bool) {
        let rooms = self.filtered_rooms();
        if rooms.is_empty() {
            return;
        }
        let current = self
            .directory
            .selected_room_id()
            .and_then(|id| rooms.iter().position(|r| r.id == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(rooms.len() - 1),
            (Some(i), false) => i.saturating_sub(1),
        };
        self.directory.set_selected_room_id(Some(rooms[next].id));
    }

    pub fn select_next_room(&mut self) {
        self.select_relative(true);
    }

    pub fn select_prev_room(&mut self) {
        self.select_relative(false);
    }

    pub fn select_room(&mut self, room_id: Option<RoomId>) {
        self.directory.set_selected_room_id(room_id);
    }

    /// Brings the thread in line with the directory's selection. Returns a
    /// ticket when a thread load must be started.
    pub fn sync_thread(&mut self) -> Option<LoadTicket> {
        let selected = self.directory.selected_room_id();
        if selected == self.thread.room_id() {
            return None;
        }
        match selected {
            Some(room_id) => Some(self.thread.begin_load(room_id)),
            None => {
                self.thread.clear();
                None
            }
        }
    }

    /// Forces a reload of the open room.
    pub fn reload_thread(&mut self) -> Option<LoadTicket> {
        let room_id = self.directory.selected_room_id()?;
        Some(self.thread.begin_load(room_id))
    }

    // ---- Panels ----

    pub fn next_panel(&mut self) {
        self.active_panel = match self.active_panel {
            Panel::RoomList => Panel::Messages,
            Panel::Messages => Panel::Input,
            Panel::Input => Panel::RoomList,
        };
    }

    pub fn prev_panel(&mut self) {
        self.active_panel = match self.active_panel {
            Panel::RoomList => Panel::Input,
            Panel::Messages => Panel::RoomList,
            Panel::Input => Panel::Messages,
        };
    }

    // ---- Notices ----

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn notify_error(&mut self, context: &str, err: &ChatError) {
        self.notify(NoticeLevel::Error, format!("{}: {}", context, err));
    }

    pub fn active_notice(&self) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| n.shown_at.elapsed() < self.notice_duration)
    }

    pub fn expire_notice(&mut self) {
        if self.notice.is_some() && self.active_notice().is_none() {
            self.notice = None;
        }
    }

    // ---- Dialogs ----

    pub fn open_create_room(&mut self) {
        self.dialog = Some(Dialog::CreateRoom(CreateRoomDialog::new()));
    }

    pub fn open_rename(&mut self) -> Result<()> {
        let room = self.require_selected_room()?;
        self.dialog = Some(Dialog::Rename(RenameDialog::for_room(&room)));
        Ok(())
    }

    pub fn open_delete(&mut self) -> Result<()> {
        let room = self.require_selected_room()?;
        self.dialog = Some(Dialog::Delete(DeleteDialog::for_room(&room)));
        Ok(())
    }

    pub fn open_invite(&mut self) -> Result<()> {
        let room = self.require_selected_room()?;
        self.dialog = Some(Dialog::Invite(Box::new(InviteDialog::for_room(
            &room,
            self.search_delay,
        ))));
        Ok(())
    }

    pub fn open_profile(&mut self) -> Result<()> {
        let user = self
            .current_user()
            .ok_or_else(|| ChatError::validation("Not signed in"))?;
        self.dialog = Some(Dialog::Profile(Box::new(ProfileDialog::for_user(&user))));
        Ok(())
    }

    pub fn open_attach(&mut self) -> Result<()> {
        self.require_selected_room()?;
        self.dialog = Some(Dialog::Attach(TextInput::new()));
        Ok(())
    }

    pub fn close_dialog(&mut self) {
        if let Some(Dialog::Invite(ref mut invite)) = self.dialog {
            invite.cancel();
        }
        self.dialog = None;
    }

    fn require_selected_room(&self) -> Result<Room> {
        self.directory
            .selected_room()
            .ok_or_else(|| ChatError::validation("Select a room first"))
    }

    /// Drops every trace of the signed-in user.
    pub fn sign_out(&mut self) -> Result<()> {
        self.close_dialog();
        self.directory.clear_state();
        self.thread.clear();
        self.composer.clear();
        self.room_filter.clear();
        self.session.sign_out()
    }
}

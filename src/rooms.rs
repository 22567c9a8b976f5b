//! Room admin dialogs: create, rename, delete.

use tracing::info;

use crate::client::ChatClient;
use crate::directory::{Committed, RoomDirectory};
use crate::error::{ChatError, Result};
use crate::input::TextInput;
use crate::models::{NewRoom, Room, RoomId, RoomPatch, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomField {
    Name,
    Description,
}

/// Name + description form shared by the create and rename dialogs.
#[derive(Debug, Clone)]
pub struct RoomForm {
    pub name: TextInput,
    pub description: TextInput,
    pub focus: RoomField,
    /// Inline validation message, shown under the form.
    pub error: Option<String>,
}

impl Default for RoomForm {
    fn default() -> Self {
        Self {
            name: TextInput::new(),
            description: TextInput::new(),
            focus: RoomField::Name,
            error: None,
        }
    }
}

impl RoomForm {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            RoomField::Name => RoomField::Description,
            RoomField::Description => RoomField::Name,
        };
    }

    pub fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            RoomField::Name => &mut self.name,
            RoomField::Description => &mut self.description,
        }
    }

    fn require_name(&mut self) -> Result<String> {
        let name = self.name.as_str().trim();
        if name.is_empty() {
            let err = ChatError::validation("Room name cannot be empty");
            self.error = Some(err.to_string());
            return Err(err);
        }
        self.error = None;
        Ok(name.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateRoomDialog {
    pub form: RoomForm,
}

impl CreateRoomDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The creator is always seeded as the first participant.
    pub fn validate(&mut self, creator: UserId) -> Result<NewRoom> {
        let name = self.form.require_name()?;
        Ok(NewRoom {
            name,
            description: self.form.description.as_str().to_string(),
            participants: vec![creator],
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenameDialog {
    pub room_id: RoomId,
    pub form: RoomForm,
}

impl RenameDialog {
    pub fn for_room(room: &Room) -> Self {
        Self {
            room_id: room.id,
            form: RoomForm {
                name: TextInput::with_value(room.name.clone()),
                description: TextInput::with_value(room.description_text()),
                ..RoomForm::default()
            },
        }
    }

    pub fn validate(&mut self) -> Result<RoomPatch> {
        let name = self.form.require_name()?;
        Ok(RoomPatch {
            name: Some(name),
            description: Some(self.form.description.as_str().trim().to_string()),
            participants: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDialog {
    pub room_id: RoomId,
    pub room_name: String,
}

impl DeleteDialog {
    pub fn for_room(room: &Room) -> Self {
        Self {
            room_id: room.id,
            room_name: room.name.clone(),
        }
    }
}

/// Validation errors are recorded on the dialog and no request is made.
/// Request errors leave the form untouched for another try.
pub async fn create_room(
    client: &ChatClient,
    directory: &RoomDirectory,
    dialog: &mut CreateRoomDialog,
    creator: UserId,
) -> Result<Committed<Room>> {
    let new_room = dialog.validate(creator)?;
    let room = client.create_room(&new_room).await?;
    info!(room_id = room.id, name = %room.name, "room created");
    Ok(directory.refresh_after(client, room).await)
}

pub async fn rename_room(
    client: &ChatClient,
    directory: &RoomDirectory,
    dialog: &mut RenameDialog,
) -> Result<Committed<Room>> {
    let patch = dialog.validate()?;
    let room = client.update_room(dialog.room_id, &patch).await?;
    info!(room_id = room.id, name = %room.name, "room renamed");
    let mut committed = directory.refresh_after(client, room).await;
    // The server may hand back a different id; follow it.
    let new_id = committed.value.id;
    if directory.selected_room_id() != Some(new_id) {
        directory.set_selected_room_id(Some(new_id));
        if let Err(e) = directory.refresh_members(client).await {
            committed.refresh_error.get_or_insert(e);
        }
    }
    Ok(committed)
}

pub async fn delete_room(
    client: &ChatClient,
    directory: &RoomDirectory,
    dialog: &DeleteDialog,
) -> Result<Committed<RoomId>> {
    client.delete_room(dialog.room_id).await?;
    info!(room_id = dialog.room_id, "room deleted");
    directory.set_selected_room_id(None);
    Ok(directory.refresh_after(client, dialog.room_id).await)
}

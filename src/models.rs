use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type RoomId = i64;
pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room: RoomId,
    pub sender: UserId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /rooms/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRoom {
    pub name: String,
    pub description: String,
    pub participants: Vec<UserId>,
}

/// Body of `PATCH /rooms/{id}/`. Absent fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoomPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<UserId>>,
}

/// Multipart body of `POST /messages/`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub content: String,
    pub room: RoomId,
    pub sender: UserId,
    pub file: Option<Attachment>,
}

/// A local file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// A message decorated with its sender's display data.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadEntry {
    pub message: Message,
    pub username: String,
    pub avatar: Option<String>,
}

impl ThreadEntry {
    pub fn decorate(message: Message, sender: Option<&User>) -> Self {
        Self {
            username: sender
                .map(|u| u.username.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            avatar: sender.and_then(|u| u.avatar.clone()),
            message,
        }
    }

    pub fn content_text(&self) -> &str {
        self.message.content.as_deref().unwrap_or("").trim()
    }

    pub fn attachment(&self) -> Option<&str> {
        self.message
            .file
            .as_deref()
            .or(self.message.image.as_deref())
            .filter(|f| !f.is_empty())
    }

    pub fn formatted_time(&self) -> String {
        self.message
            .created_at
            .map(|dt| dt.with_timezone(&chrono::Local).format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

impl Room {
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }
}

/// `"holiday-photos.png"` becomes `"holid....png"`: the first five characters of
/// the stem, an ellipsis when the stem was longer, then the extension.
pub fn shorten_file_name(file_name: &str) -> String {
    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };
    let short: String = stem.chars().take(5).collect();
    let ellipsis = if stem.chars().count() > 5 { "..." } else { "" };
    format!("{}{}{}", short, ellipsis, ext)
}

/// Last path segment of an attachment URL, for display.
pub fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, warn};

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::input::TextInput;
use crate::models::{Attachment, User, UserId};
use crate::session::Session;

/// A chosen avatar decoded locally, before upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPreview {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

pub fn preview_avatar(file: &Attachment) -> Result<AvatarPreview> {
    let format = image::guess_format(&file.bytes).map_err(|_| {
        ChatError::validation(format!("{} is not a supported image", file.file_name))
    })?;
    let img = image::load_from_memory_with_format(&file.bytes, format)
        .map_err(|e| ChatError::validation(format!("Could not decode {}: {}", file.file_name, e)))?;
    Ok(AvatarPreview {
        data_url: format!(
            "data:{};base64,{}",
            format.to_mime_type(),
            STANDARD.encode(&file.bytes)
        ),
        width: img.width(),
        height: img.height(),
    })
}

/// Adds a `t` query parameter so a replaced avatar is not served from cache.
pub fn cache_busted(url: &str, stamp_millis: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, stamp_millis)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Username,
    AvatarPath,
}

#[derive(Debug, Clone)]
pub struct ProfileDialog {
    pub user_id: UserId,
    pub username: TextInput,
    pub current_avatar: Option<String>,
    pub avatar_path: TextInput,
    pub new_avatar: Option<Attachment>,
    pub preview: Option<AvatarPreview>,
    pub focus: ProfileField,
    pub error: Option<String>,
}

impl ProfileDialog {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: TextInput::with_value(user.username.clone()),
            current_avatar: user.avatar.clone(),
            avatar_path: TextInput::new(),
            new_avatar: None,
            preview: None,
            focus: ProfileField::Username,
            error: None,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ProfileField::Username => ProfileField::AvatarPath,
            ProfileField::AvatarPath => ProfileField::Username,
        };
    }

    pub fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            ProfileField::Username => &mut self.username,
            ProfileField::AvatarPath => &mut self.avatar_path,
        }
    }

    /// Keeps the file only if it decodes as an image.
    pub fn choose_avatar(&mut self, file: Attachment) -> Result<()> {
        match preview_avatar(&file) {
            Ok(preview) => {
                self.preview = Some(preview);
                self.new_avatar = Some(file);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.preview = None;
                self.new_avatar = None;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Loads the file named in the avatar path field.
    pub fn choose_avatar_from_path(&mut self) -> Result<()> {
        let path = self.avatar_path.as_str().trim().to_string();
        if path.is_empty() {
            self.new_avatar = None;
            self.preview = None;
            return Ok(());
        }
        let file = Attachment::from_path(std::path::Path::new(&path)).inspect_err(|e| {
            self.error = Some(format!("Cannot read {}: {}", path, e));
        })?;
        self.choose_avatar(file)
    }

    fn validate(&mut self) -> Result<String> {
        let username = self.username.as_str().trim();
        if username.is_empty() {
            let err = ChatError::validation("Username cannot be empty");
            self.error = Some(err.to_string());
            return Err(err);
        }
        Ok(username.to_string())
    }
}

/// The server accepted the profile change. `save_error` is set when the new
/// record could not be written to the session file.
#[derive(Debug)]
pub struct ProfileUpdate {
    pub user: User,
    pub save_error: Option<ChatError>,
}

/// Patches the profile, re-reads the canonical record, cache-busts its avatar
/// and stores it in the session.
pub async fn update_profile(
    client: &ChatClient,
    session: &Session,
    dialog: &mut ProfileDialog,
) -> Result<ProfileUpdate> {
    let username = dialog.validate()?;
    client
        .update_user(dialog.user_id, &username, dialog.new_avatar.as_ref())
        .await?;
    let mut user = client.get_user(dialog.user_id).await?;
    user.id = dialog.user_id;
    let stamp = chrono::Utc::now().timestamp_millis();
    user.avatar = user.avatar.as_deref().map(|url| cache_busted(url, stamp));
    let save_error = session.set_user(user.clone()).err();
    if let Some(ref e) = save_error {
        warn!("Profile updated but session not saved: {}", e);
    }
    info!(user_id = user.id, "profile updated");
    Ok(ProfileUpdate { user, save_error })
}

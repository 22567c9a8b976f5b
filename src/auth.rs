use tracing::info;
use zeroize::Zeroize;

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::models::{Attachment, User, UserId};
use crate::session::Session;

const KEYRING_SERVICE: &str = "roomchat-client";
const KEYRING_USER: &str = "api-token";

// ---- API token storage ----

fn keyring_entry() -> Option<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()
}

fn token_file_path() -> anyhow::Result<std::path::PathBuf> {
    Ok(crate::config::config_dir()?.join(".token"))
}

/// Stores the bearer token in the OS credential store, falling back to a file
/// in the config dir (protected by OS user permissions).
pub fn store_api_token(token: &str) -> anyhow::Result<()> {
    if let Some(entry) = keyring_entry() {
        if entry.set_password(token).is_ok() {
            return Ok(());
        }
    }
    std::fs::write(token_file_path()?, token)?;
    Ok(())
}

pub fn load_api_token() -> anyhow::Result<Option<String>> {
    if let Some(token) = keyring_entry()
        .and_then(|e| e.get_password().ok())
        .filter(|s| !s.is_empty())
    {
        return Ok(Some(token));
    }
    let path = token_file_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let mut raw = std::fs::read_to_string(&path)?;
    let token = raw.trim().to_string();
    raw.zeroize();
    Ok(Some(token).filter(|t| !t.is_empty()))
}

pub fn clear_stored_token() -> anyhow::Result<()> {
    if let Some(entry) = keyring_entry() {
        let _ = entry.delete_credential();
    }
    if let Ok(path) = token_file_path() {
        if path.exists() {
            // Overwrite before delete
            let len = std::fs::metadata(&path).map(|m| m.len() as usize).unwrap_or(0);
            let _ = std::fs::write(&path, vec![0u8; len]);
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}

// ---- Registration ----

#[derive(Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub avatar: Option<Attachment>,
}

impl Drop for RegisterForm {
    fn drop(&mut self) {
        self.password.zeroize();
        self.confirm_password.zeroize();
    }
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            &self.username,
            &self.email,
            &self.password,
            &self.confirm_password,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ChatError::validation("Please fill in every field"));
        }
        if self.password != self.confirm_password {
            return Err(ChatError::validation("Passwords do not match"));
        }
        Ok(())
    }
}

/// Creates the account and signs the session in as the new user.
pub async fn register(client: &ChatClient, session: &Session, form: &RegisterForm) -> Result<User> {
    form.validate()?;
    let user = client
        .register(
            form.username.trim(),
            form.email.trim(),
            &form.password,
            form.avatar.as_ref(),
        )
        .await?;
    info!(user_id = user.id, "registered");
    session.sign_in(user.clone())?;
    Ok(user)
}

/// Resolves an existing account and signs the session in as it.
pub async fn sign_in(client: &ChatClient, session: &Session, user_id: UserId) -> Result<User> {
    let user = client.get_user(user_id).await?;
    session.sign_in(user.clone())?;
    Ok(user)
}

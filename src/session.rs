use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ChatError, Result};
use crate::models::{User, UserId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(rename = "isLogin", default)]
    pub is_login: bool,
}

/// Session persisted as a JSON object under the fixed keys `user` and `isLogin`.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is a signed-out session.
    pub fn load(&self) -> Result<SessionState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionState::default())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            ChatError::Storage(format!("corrupt session file {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Current user and login state. Every change publishes a fresh snapshot and
/// is written through to the store.
pub struct Session {
    store: SessionStore,
    state: watch::Sender<Arc<SessionState>>,
}

impl Session {
    pub fn rehydrate(store: SessionStore) -> Self {
        let initial = match store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Starting signed out, could not read session: {}", e);
                SessionState::default()
            }
        };
        let (state, _) = watch::channel(Arc::new(initial));
        Self { store, state }
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.state.borrow().user.as_ref().map(|u| u.id)
    }

    pub fn is_logged_in(&self) -> bool {
        let state = self.state.borrow();
        state.is_login && state.user.is_some()
    }

    pub fn sign_in(&self, user: User) -> Result<()> {
        info!(user_id = user.id, "signed in");
        self.publish(SessionState {
            user: Some(user),
            is_login: true,
        })
    }

    /// Replaces the user record, keeping the login flag.
    ///
    /// The in-memory record changes even when writing it to the store fails.
    pub fn set_user(&self, user: User) -> Result<()> {
        let next = SessionState {
            user: Some(user),
            is_login: self.state.borrow().is_login,
        };
        self.state.send_replace(Arc::new(next.clone()));
        self.store.save(&next)
    }

    pub fn sign_out(&self) -> Result<()> {
        info!("signed out");
        self.state.send_replace(Arc::new(SessionState::default()));
        self.store.clear()
    }

    fn publish(&self, next: SessionState) -> Result<()> {
        self.store.save(&next)?;
        self.state.send_replace(Arc::new(next));
        Ok(())
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";
pub const API_URL_ENV: &str = "ROOMCHAT_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub search_debounce_ms: u64,
    pub notice_secs: u64,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            search_debounce_ms: 300,
            notice_secs: 4,
            log_level: None,
        }
    }
}

impl Config {
    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_secs(self.notice_secs)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("roomchat");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_dir()?.join("config.toml"))
}

/// Writes a commented template on first run, then parses the file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let template = format!(
            r#"# roomchat configuration

# Base URL of the chat server's REST API
api_base_url = "{}"

# Bearer token sent with every request. Prefer `roomchat --set-token`,
# which keeps it in your OS credential manager instead of this file.
# api_token = ""

# Delay before the member search fires while typing
search_debounce_ms = 300

# How long status bar notices stay visible
notice_secs = 4

# Log filter for roomchat.log, e.g. "roomchat=debug"
# log_level = "roomchat=info"
"#,
            DEFAULT_API_URL
        );
        std::fs::write(path, template)?;
    }
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content).context("Invalid config file format")?;
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            config.api_base_url = url;
        }
    }
    if config.api_base_url.trim().is_empty() {
        config.api_base_url = DEFAULT_API_URL.to_string();
    }
    if config.api_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        config.api_token = None;
    }
    Ok(config)
}

pub fn print_setup_guide() {
    eprintln!("Setup Guide:");
    eprintln!("  1. Edit the config file in your config directory (roomchat/config.toml)");
    eprintln!("     and point api_base_url at your chat server, e.g. {}", DEFAULT_API_URL);
    eprintln!("  2. If the server needs a token, run: roomchat --set-token");
    eprintln!("  3. Sign in with an existing account: roomchat --login <user-id>");
    eprintln!("     or create one:                   roomchat --register");
    eprintln!("  4. Run roomchat");
}

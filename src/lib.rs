pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod input;
pub mod invite;
pub mod logging;
pub mod models;
pub mod profile;
pub mod rooms;
pub mod session;
pub mod thread;
pub mod ui;

pub use error::{ChatError, Result};

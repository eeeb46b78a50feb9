//! Settings collaborator: supplies the per-chat settings snapshot a session
//! is created with.

pub mod provider;

pub use provider::{SettingsError, SettingsProvider, StaticSettingsProvider};

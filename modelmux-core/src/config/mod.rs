//! System settings for modelmux.
//!
//! Manages the router's global settings stored in SQLite.

mod settings;
mod store;
mod values;

pub use settings::{SettingKey, SystemSettings};
pub use store::{SettingsChange, SettingsStore};
pub use values::{LogLevel, SettingEntry, SettingType, SettingValue};

//! Application settings persistence
//!
//! Re-exports the shared settings types from perch-types and stores them with
//! confy under `perch/settings.toml` in the platform config directory.

pub use perch_types::{GestureSettings, PerchSettings, ToolSettings};

use std::path::PathBuf;

use thiserror::Error;

use crate::store::default_store_dir;

const APP_NAME: &str = "perch";
const CONFIG_NAME: &str = "settings";

/// Errors during settings operations
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save settings")]
    Save(#[source] confy::ConfyError),
}

/// Extension trait for PerchSettings persistence
pub trait PerchSettingsExt: Sized {
    /// Load settings, falling back to defaults when the file is missing or unreadable
    fn load() -> Self;
    fn try_load() -> Result<Self, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn settings_path() -> Option<PathBuf>;
    /// Directory holding instance records
    fn resolved_store_dir(&self) -> PathBuf;
}

impl PerchSettingsExt for PerchSettings {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default settings");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, SettingsError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn save(&self) -> Result<(), SettingsError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(SettingsError::Save)
    }

    fn settings_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).ok()
    }

    fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_store_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_types::ToolKind;

    #[test]
    fn settings_toml_round_trip() {
        let mut settings = PerchSettings::default();
        settings.set_max_instances(ToolKind::Randomizer, 6);
        settings.gesture.touch_slop_px = 8.0;
        settings.store_dir = Some("/tmp/perch-records".to_string());

        let text = toml::to_string(&settings).unwrap();
        let parsed: PerchSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed: PerchSettings = toml::from_str("clone_offset_px = 10\n").unwrap();
        assert_eq!(parsed.clone_offset_px, 10);
        assert_eq!(parsed.gesture, GestureSettings::default());
        assert_eq!(parsed.max_instances(ToolKind::Spotlight), 7);
    }

    #[test]
    fn explicit_store_dir_wins() {
        let settings = PerchSettings {
            store_dir: Some("/srv/perch".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolved_store_dir(), PathBuf::from("/srv/perch"));

        let blank = PerchSettings {
            store_dir: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.resolved_store_dir(), default_store_dir());
    }
}

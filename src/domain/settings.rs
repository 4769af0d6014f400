use crate::protocol;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            rotation: default_rotation(),
            ansi_colors: default_true(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "ledlink".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Crate settings. The BLE identifiers default to the LED + Button panel
/// firmware; substitute them to target a peripheral with different UUIDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_state_char_uuid")]
    pub ble_state_char_uuid: String,
    #[serde(default = "default_led_char_uuid")]
    pub ble_led_char_uuid: String,
    #[serde(default = "default_button_char_uuid")]
    pub ble_button_char_uuid: String,

    /// Flat retry interval for the availability check, in seconds.
    #[serde(default = "default_availability_retry_secs")]
    pub availability_retry_secs: u64,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ble_service_uuid: default_service_uuid(),
            ble_state_char_uuid: default_state_char_uuid(),
            ble_led_char_uuid: default_led_char_uuid(),
            ble_button_char_uuid: default_button_char_uuid(),
            availability_retry_secs: default_availability_retry_secs(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_service_uuid() -> String {
    protocol::USER_SERVICE_UUID.to_string()
}
fn default_state_char_uuid() -> String {
    protocol::STATE_CHARACTERISTIC_UUID.to_string()
}
fn default_led_char_uuid() -> String {
    protocol::LED_CHARACTERISTIC_UUID.to_string()
}
fn default_button_char_uuid() -> String {
    protocol::BUTTON_CHARACTERISTIC_UUID.to_string()
}
fn default_availability_retry_secs() -> u64 {
    10
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("ledlink");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_firmware() {
        let settings = Settings::default();
        assert_eq!(
            settings.ble_service_uuid,
            "ae8edba0-a010-44ba-bfd6-913754414ca1"
        );
        assert_eq!(settings.availability_retry_secs, 10);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.ble_led_char_uuid, default_led_char_uuid());
        assert_eq!(settings.log_settings.level, "info");
    }
}

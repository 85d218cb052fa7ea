//! User preferences and the app PIN.
use std::{fmt, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{NotepadError, Result};

/// PIN used until the user picks their own.
pub const DEFAULT_PIN: &str = "1234";

/// Text size preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
        };
        f.write_str(name)
    }
}

/// A four digit PIN. Construction fails for anything else.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Pin {
    fn default() -> Self {
        Pin(DEFAULT_PIN.to_string())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

impl TryFrom<String> for Pin {
    type Error = NotepadError;

    fn try_from(value: String) -> Result<Self> {
        if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
            Ok(Pin(value))
        } else {
            Err(NotepadError::validation("PIN must be 4 digits"))
        }
    }
}

impl FromStr for Pin {
    type Err = NotepadError;

    fn from_str(value: &str) -> Result<Self> {
        Pin::try_from(value.to_string())
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

/// The singleton settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub dark_mode: bool,
    pub font_size: FontSize,
    pub app_lock: bool,
    pub pin: Pin,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            font_size: FontSize::Medium,
            app_lock: false,
            pin: Pin::default(),
            notifications: true,
        }
    }
}

impl Settings {
    /// Shallow-merges `patch` key by key over these settings.
    ///
    /// The merged record is validated as a whole, so a patch carrying a
    /// malformed PIN or an unknown font size is rejected without touching
    /// `self`.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Result<Settings> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(current)).map_err(|e| NotepadError::Parse {
            message: format!("invalid settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn pin_requires_exactly_four_digits() {
        assert!("0420".parse::<Pin>().is_ok());
        assert!("123".parse::<Pin>().is_err());
        assert!("12345".parse::<Pin>().is_err());
        assert!("12a4".parse::<Pin>().is_err());
        assert!("١٢٣٤".parse::<Pin>().is_err());
    }

    #[test]
    fn settings_serialize_with_camel_case_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "darkMode": true,
                "fontSize": "medium",
                "appLock": false,
                "pin": "1234",
                "notifications": true,
            })
        );
    }

    #[test]
    fn partial_settings_fill_from_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"fontSize":"large"}"#).unwrap();
        assert_eq!(settings.font_size, FontSize::Large);
        assert!(settings.dark_mode);
        assert_eq!(settings.pin.as_str(), DEFAULT_PIN);
    }

    #[test]
    fn merge_overrides_only_supplied_keys() {
        let current = Settings {
            dark_mode: false,
            ..Settings::default()
        };
        let patch = json!({ "pin": "9876", "notifications": false });
        let merged = current.merged_with(patch.as_object().unwrap()).unwrap();

        assert!(!merged.dark_mode);
        assert!(!merged.notifications);
        assert!(merged.pin.matches("9876"));
    }

    #[test]
    fn merge_rejects_bad_pin() {
        let patch = json!({ "pin": "12" });
        let err = Settings::default()
            .merged_with(patch.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, NotepadError::Parse { .. }));
    }

    #[test]
    fn pin_debug_hides_digits() {
        assert_eq!(format!("{:?}", Pin::default()), "Pin(****)");
    }
}

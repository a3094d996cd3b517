use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{js_error_message, NoteStoreError};

/// Where the notes live: the database name and the schema version to open it at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteStoreConfig {
    pub name: String,
    pub version: u32,
}

impl Default for NoteStoreConfig {
    fn default() -> Self {
        Self {
            name: "notes_db".to_string(),
            version: 1,
        }
    }
}

impl NoteStoreConfig {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Read a `{ name, version }` object handed over by the host page. Missing fields keep their
    /// defaults.
    pub fn from_js(value: JsValue) -> Result<Self, NoteStoreError> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }

        serde_wasm_bindgen::from_value(value)
            .map_err(|e| NoteStoreError::Open(js_error_message(&e.into())))
    }

    /// IndexedDB only accepts versions of 1 and above.
    pub fn validate(&self) -> Result<(), NoteStoreError> {
        if self.version == 0 {
            return Err(NoteStoreError::Open(format!(
                "version of \"{}\" must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NoteStoreConfig::default();
        assert_eq!(config.name, "notes_db");
        assert_eq!(config.version, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: NoteStoreConfig = serde_json::from_str(r#"{ "name": "scratch" }"#).unwrap();
        assert_eq!(config, NoteStoreConfig::new("scratch", 1));

        let config: NoteStoreConfig = serde_json::from_str(r#"{ "version": 3 }"#).unwrap();
        assert_eq!(config, NoteStoreConfig::new("notes_db", 3));
    }

    #[test]
    fn test_zero_version_is_rejected() {
        let err = NoteStoreConfig::new("notes_db", 0).validate().unwrap_err();
        assert!(matches!(err, NoteStoreError::Open(_)));
    }
}

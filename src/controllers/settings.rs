//! Typed access to free-form controller settings.

use std::path::PathBuf;

use serde_json::Value;

use crate::config::{ControllerConfig, Settings};
use crate::controllers::BuildError;

/// Reads one controller's settings, producing errors that name the controller.
pub struct SettingsReader<'a> {
    controller: &'a str,
    settings: &'a Settings,
}

impl<'a> SettingsReader<'a> {
    pub fn new(config: &'a ControllerConfig) -> Self {
        Self {
            controller: &config.name,
            settings: &config.settings,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    pub fn missing(&self, key: &str) -> BuildError {
        BuildError::MissingSetting {
            controller: self.controller.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidSetting {
            controller: self.controller.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, BuildError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(key, "expected a string")),
        }
    }

    /// A non-empty string setting.
    pub fn required_str(&self, key: &str) -> Result<&'a str, BuildError> {
        match self.optional_str(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            Some(_) => Err(self.invalid(key, "must not be empty")),
            None => Err(self.missing(key)),
        }
    }

    pub fn required_path(&self, key: &str) -> Result<PathBuf, BuildError> {
        self.required_str(key).map(PathBuf::from)
    }

    pub fn optional_u64(&self, key: &str) -> Result<Option<u64>, BuildError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a non-negative integer")),
        }
    }

    pub fn optional_str_list(&self, key: &str) -> Result<Option<Vec<String>>, BuildError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "expected a list of strings"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(self.invalid(key, "expected a list of strings")),
        }
    }

    /// A list whose items may be integers or strings (e.g. ASNs written as `"AS13335"`).
    pub fn optional_raw_list(&self, key: &str) -> Result<Option<Vec<String>>, BuildError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(self.invalid(key, "expected numbers or strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(self.invalid(key, "expected a list")),
        }
    }

    /// Optional per-controller cache bound. Zero is rejected.
    pub fn cache_capacity(&self) -> Result<Option<usize>, BuildError> {
        match self.optional_u64("cache_capacity")? {
            Some(0) => Err(self.invalid("cache_capacity", "must be > 0")),
            Some(n) => Ok(Some(n as usize)),
            None => Ok(None),
        }
    }
}

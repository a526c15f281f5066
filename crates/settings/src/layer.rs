//! Settings layers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde_json::Value;

use crate::SettingsError;

/// Layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerPriority {
    /// Built-in defaults
    Default = 0,
    /// User global settings
    User = 10,
    /// Workspace settings (`.webby/settings.json`)
    Workspace = 20,
}

/// A settings layer: flat dotted keys mapped to JSON values
#[derive(Debug, Clone)]
pub struct SettingsLayer {
    pub priority: LayerPriority,
    /// File the layer was loaded from, if any
    pub source: Option<PathBuf>,
    values: HashMap<String, Value>,
}

impl SettingsLayer {
    pub fn new(priority: LayerPriority) -> Self {
        Self {
            priority,
            source: None,
            values: HashMap::new(),
        }
    }

    /// Load from a JSONC file
    pub fn from_file(path: &Path, priority: LayerPriority) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut layer = Self::from_json(&content, priority).map_err(|err| match err {
            SettingsError::Parse { source, .. } => SettingsError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })?;
        layer.source = Some(path.to_path_buf());
        Ok(layer)
    }

    /// Load from a JSONC string
    pub fn from_json(json: &str, priority: LayerPriority) -> Result<Self, SettingsError> {
        let clean_json = strip_json_comments(json);
        let value: Value = serde_json::from_str(&clean_json)
            .map_err(|source| SettingsError::Parse { path: None, source })?;

        let mut layer = Self::new(priority);
        if let Value::Object(obj) = value {
            layer.values.extend(obj);
        }
        Ok(layer)
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a value
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// All values in this layer
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Save to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|source| SettingsError::Parse { path: None, source })?;
        std::fs::write(path, json).map_err(io_err)
    }
}

/// Strip `//` and `/* */` comments from JSONC, leaving string contents intact
fn strip_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                while let Some(&ch) = chars.peek() {
                    if ch == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
            }
            _ => result.push(c),
        }
    }

    result
}

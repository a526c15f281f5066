//! # Webby Settings
//!
//! User and workspace settings with layered configuration.
//! Keys are flat dotted names (`webby.debug.runtime`) stored in JSONC files.

pub mod config;
pub mod layer;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde_json::Value;
use thiserror::Error;

pub use config::{DebugSettings, ServerSettings, TerminalSettings, TraceLevel, WebbyConfig, keys};
pub use layer::{LayerPriority, SettingsLayer};
pub use schema::{SettingSchema, SettingType};

/// Settings error
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON{}: {source}", in_file(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: String, message: String },
    #[error("no layer with priority {0:?}")]
    MissingLayer(LayerPriority),
}

/// Settings manager
pub struct Settings {
    /// Schema registry
    schemas: HashMap<String, SettingSchema>,
    /// Settings layers, lowest priority first
    layers: Vec<SettingsLayer>,
}

impl Settings {
    /// Create settings holding only built-in defaults
    pub fn new() -> Self {
        let mut settings = Self {
            schemas: HashMap::new(),
            layers: Vec::new(),
        };
        settings.add_layer(SettingsLayer::new(LayerPriority::Default));
        config::register_schemas(&mut settings);
        settings
    }

    /// Load defaults, then the user file, then the workspace file when present
    pub fn load(workspace_root: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = Self::new();

        let user = user_settings_path().filter(|p| p.exists());
        let workspace = workspace_root.map(workspace_settings_path).filter(|p| p.exists());

        if let Some(path) = user {
            settings.add_layer(SettingsLayer::from_file(&path, LayerPriority::User)?);
        }
        if let Some(path) = workspace {
            settings.add_layer(SettingsLayer::from_file(&path, LayerPriority::Workspace)?);
        }

        settings.report_invalid();
        Ok(settings)
    }

    /// Register a setting schema
    pub fn register_schema(&mut self, key: &str, schema: SettingSchema) {
        self.schemas.insert(key.to_string(), schema);
    }

    /// Add a settings layer, replacing one with the same priority
    pub fn add_layer(&mut self, layer: SettingsLayer) {
        self.layers.retain(|l| l.priority != layer.priority);
        self.layers.push(layer);
        self.layers.sort_by_key(|l| l.priority);
    }

    /// Get a typed setting value
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Get the raw value from the highest layer defining it, falling back to the schema default
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(key))
            .cloned()
            .or_else(|| self.schemas.get(key).and_then(|s| s.default.clone()))
    }

    /// Set a value in the layer with the given priority after validating it
    pub fn set(
        &mut self,
        key: &str,
        value: Value,
        priority: LayerPriority,
    ) -> Result<(), SettingsError> {
        if let Some(schema) = self.schemas.get(key) {
            schema.validate(&value).map_err(|message| SettingsError::Invalid {
                key: key.to_string(),
                message,
            })?;
        }

        let layer = self.layers
            .iter_mut()
            .find(|l| l.priority == priority)
            .ok_or(SettingsError::MissingLayer(priority))?;
        layer.set(key, value);
        Ok(())
    }

    /// All settings, merged
    pub fn all(&self) -> HashMap<String, Value> {
        let mut result: HashMap<String, Value> = self.schemas
            .iter()
            .filter_map(|(key, schema)| schema.default.clone().map(|v| (key.clone(), v)))
            .collect();

        for layer in &self.layers {
            for (key, value) in layer.values() {
                result.insert(key.clone(), value.clone());
            }
        }

        result
    }

    /// Set a value and write its layer to `path`, creating the layer when no
    /// file backed it yet. Comments in an existing file are not kept.
    pub fn write(
        &mut self,
        key: &str,
        value: Value,
        priority: LayerPriority,
        path: &Path,
    ) -> Result<(), SettingsError> {
        if !self.layers.iter().any(|l| l.priority == priority) {
            self.add_layer(SettingsLayer::new(priority));
        }
        self.set(key, value, priority)?;

        let layer = self.layers
            .iter()
            .find(|l| l.priority == priority)
            .ok_or(SettingsError::MissingLayer(priority))?;
        layer.save(path)
    }

    /// Typed snapshot of the `webby.*` settings
    pub fn webby_config(&self) -> WebbyConfig {
        WebbyConfig::from_settings(self)
    }

    /// Values loaded from files are kept even when invalid; they fail where used.
    fn report_invalid(&self) {
        for layer in &self.layers {
            for (key, value) in layer.values() {
                match self.schemas.get(key) {
                    Some(schema) => {
                        if let Err(message) = schema.validate(value) {
                            tracing::warn!(
                                "Setting `{}` in {:?} layer: {}",
                                key,
                                layer.priority,
                                message
                            );
                        }
                    }
                    None => tracing::debug!("Unknown setting `{}`", key),
                }
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default()
}

/// User settings path
pub fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("webby").join("settings.json"))
}

/// Workspace settings path
pub fn workspace_settings_path(root: &Path) -> PathBuf {
    root.join(".webby").join("settings.json")
}

//! Setting schema definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Setting schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingSchema {
    /// Setting type
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    /// Value used when no layer defines the key
    pub default: Option<Value>,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Allowed values (for string type)
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    /// Whether `null` is an accepted value
    #[serde(default)]
    pub nullable: bool,
}

impl SettingSchema {
    pub fn new(setting_type: SettingType) -> Self {
        Self {
            setting_type,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::new(SettingType::String)
    }

    pub fn boolean() -> Self {
        Self::new(SettingType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(SettingType::Object)
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Validate a value against this schema
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("Value must not be null".to_string())
            };
        }

        match self.setting_type {
            SettingType::String => {
                let Some(s) = value.as_str() else {
                    return Err("Expected string".to_string());
                };
                if let Some(ref allowed) = self.enum_values {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(format!("Value must be one of: {}", allowed.join(", ")));
                    }
                }
            }
            SettingType::Boolean => {
                if !value.is_boolean() {
                    return Err("Expected boolean".to_string());
                }
            }
            SettingType::Object => {
                if !value.is_object() {
                    return Err("Expected object".to_string());
                }
            }
        }

        Ok(())
    }
}

/// Setting type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    #[default]
    String,
    Boolean,
    Object,
}

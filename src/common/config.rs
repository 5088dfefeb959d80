//! Documented configuration files
//!
//! Config structs get a TOML file where every field carries an inline comment,
//! and unset optional fields are written commented out so users can discover them.
//!
//! # Key Insight
//!
//! - Fields with actual defaults (via `#[serde(default)]`) are **always populated** by serde
//! - Only `Option<T>` fields can be `None` (invisible in TOML), so only those need commented defaults
//!
//! # Example
//!
//! ```ignore
//! documented_config!(AppConfig {
//!     fields: [
//!         panel_url, "Base URL of the panel",
//!     ],
//!     optional: [
//!         api_key, "Application API key",
//!     ],
//!     config_path: paths::config_file(),
//! });
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata about a configuration field
#[derive(Debug, Clone)]
pub struct ConfigFieldMeta {
    pub name: &'static str,
    /// TOML-serialized default value, or None if serialization failed
    pub default_value: Option<String>,
    pub description: &'static str,
    pub is_optional: bool,
}

/// Trait for configs with documented defaults
///
/// The per-field accessors are generated by the `documented_config!` macro.
pub trait DocumentedConfig: Sized + Default + DeserializeOwned {
    /// Get metadata for all configuration fields
    fn field_metadata() -> Vec<ConfigFieldMeta>;

    /// Check if an optional field is set (Some vs None)
    fn is_optional_field_set(&self, field_name: &str) -> bool;

    /// Get the TOML-serialized value for a specific field
    fn get_field_value(&self, field_name: &str) -> String;

    /// Get path where this config should be stored
    fn config_path() -> Result<PathBuf>;

    /// Render the config as TOML with one comment per field
    fn to_documented_string(&self) -> String {
        let mut output = String::new();

        for field in Self::field_metadata() {
            // Optional fields that are unset are written commented out
            if field.is_optional && !self.is_optional_field_set(field.name) {
                let Some(default_val) = &field.default_value else {
                    continue;
                };
                output.push_str(&format!(
                    "# {} = {}  # {}\n",
                    field.name, default_val, field.description
                ));
            } else {
                output.push_str(&format!(
                    "{} = {}  # {}\n",
                    field.name,
                    self.get_field_value(field.name),
                    field.description
                ));
            }
        }

        output
    }

    /// Save config with inline documentation for unset optional values
    fn save_with_documentation(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        fs::write(path, self.to_documented_string())
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Load a config file, writing a documented default one if it is missing
    fn load_from_path_documented(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_with_documentation(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config at {}", path.display()))
    }
}

/// Macro to generate the `DocumentedConfig` trait implementation
#[macro_export]
macro_rules! documented_config {
    (
        $config_name:ident {
            fields: [
                $($field:ident, $desc:expr),* $(,)?
            ],
            optional: [
                $($opt_field:ident, $opt_desc:expr),* $(,)?
            ],
            config_path: $path:expr $(,)?
        }
    ) => {
        impl $crate::common::config::DocumentedConfig for $config_name {
            fn field_metadata() -> Vec<$crate::common::config::ConfigFieldMeta> {
                let default_config = Self::default();
                vec![
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($field),
                            default_value: toml::Value::try_from(&default_config.$field)
                                .map(|v| v.to_string())
                                .ok(),
                            description: $desc,
                            is_optional: false,
                        },
                    )*
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($opt_field),
                            default_value: {
                                // For Option<T>, serialize the inner T's default
                                let inner_default = default_config.$opt_field.clone()
                                    .unwrap_or_default();
                                toml::Value::try_from(&inner_default)
                                    .map(|v| v.to_string())
                                    .ok()
                            },
                            description: $opt_desc,
                            is_optional: true,
                        },
                    )*
                ]
            }

            fn is_optional_field_set(&self, field_name: &str) -> bool {
                match field_name {
                    $(
                        stringify!($opt_field) => self.$opt_field.is_some(),
                    )*
                    _ => false,
                }
            }

            fn get_field_value(&self, field_name: &str) -> String {
                match field_name {
                    $(
                        stringify!($field) => {
                            toml::Value::try_from(&self.$field)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| format!("{:?}", self.$field))
                        }
                    )*
                    $(
                        stringify!($opt_field) => match &self.$opt_field {
                            Some(v) => toml::Value::try_from(v)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| format!("{:?}", v)),
                            None => String::new(),
                        },
                    )*
                    _ => String::new(),
                }
            }

            fn config_path() -> anyhow::Result<std::path::PathBuf> {
                $path
            }
        }
    };
}

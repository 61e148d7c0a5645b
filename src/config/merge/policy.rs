//! Merge policy: the built-in defaults form the lowest layer.

use crate::config::SosConfig;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};

/// Start a builder seeded with `SosConfig::default()`.
///
/// Later sources override scalars and replace lists wholesale.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = serde_json::to_string(&SosConfig::default())
        .map_err(|e| ConfigError::Message(format!("Failed to serialize defaults: {}", e)))?;
    Ok(config::Config::builder().add_source(File::from_str(&defaults, FileFormat::Json)))
}

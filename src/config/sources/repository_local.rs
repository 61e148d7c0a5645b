//! Repository-local overlay stored in the repository metadata's `config` object.

use crate::repository::find_repository_root;
use crate::store::persistence::{load_repository, MetaLayout};
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;

/// Add the overlay of the repository containing `workspace_root`, if any.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(root) = find_repository_root(workspace_root) else {
        return Ok(builder);
    };
    let record = match load_repository(&MetaLayout::new(&root)) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Ignoring repository-local configuration: {}", e);
            return Ok(builder);
        }
    };
    if record.config.is_empty() {
        return Ok(builder);
    }
    let overlay = serde_json::Value::Object(record.config).to_string();
    Ok(builder.add_source(File::from_str(&overlay, FileFormat::Json)))
}

//! MergeService: orchestrates sources, applies merge policy, deserializes to SosConfig.

use crate::config::sources::{environment, global_file, repository_local};
use crate::config::SosConfig;
use config::ConfigError;
use std::path::Path;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config for a working tree.
    /// Precedence: defaults (lowest) -> global file -> repository-local overlay -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<SosConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = repository_local::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load config from a specific file instead of the global one.
    pub fn load_from_file(path: &Path, workspace_root: &Path) -> Result<SosConfig, ConfigError> {
        use config::File;

        let builder = policy::builder_with_defaults()?;
        let builder = builder.add_source(File::from(path).required(true));
        let builder = repository_local::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}

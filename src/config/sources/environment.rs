//! Environment variable source: SOS__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// Uses SOS__ prefix and __ as separator for nested keys; lists are comma-separated.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("SOS")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("ignores")
            .with_list_parse_key("ignores_whitelist")
            .with_list_parse_key("ignore_dirs")
            .with_list_parse_key("ignore_dirs_whitelist")
            .with_list_parse_key("texttype")
            .with_list_parse_key("bintype")
            .try_parsing(true),
    );
    Ok(builder)
}

//! Editing configuration documents (global TOML file or repository-local overlay).

use crate::config::SosConfig;
use crate::error::ApiError;
use serde_json::{Map, Value};
use std::path::Path;

/// How a key's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKeyKind {
    Flag,
    Text,
    List,
}

const FLAG_KEYS: &[&str] = &["strict", "track", "picky", "compress", "eol"];
const TEXT_KEYS: &[&str] = &["default_branch"];
const LIST_KEYS: &[&str] = &[
    "ignores",
    "ignores_whitelist",
    "ignore_dirs",
    "ignore_dirs_whitelist",
    "texttype",
    "bintype",
];

/// One requested change to a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEdit {
    Set { key: String, value: String },
    Unset { key: String },
    Add { key: String, value: String },
    Remove { key: String, value: String },
}

pub fn key_kind(key: &str) -> Result<ConfigKeyKind, ApiError> {
    if FLAG_KEYS.contains(&key) {
        Ok(ConfigKeyKind::Flag)
    } else if TEXT_KEYS.contains(&key) {
        Ok(ConfigKeyKind::Text)
    } else if LIST_KEYS.contains(&key) {
        Ok(ConfigKeyKind::List)
    } else {
        Err(ApiError::UsageError(format!("Unknown configuration key '{}'", key)))
    }
}

pub fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        other => Err(ApiError::UsageError(format!(
            "Cannot interpret '{}' as a flag (use on/off)",
            other
        ))),
    }
}

fn default_list(key: &str) -> Vec<Value> {
    serde_json::to_value(SosConfig::default())
        .ok()
        .and_then(|v| v.get(key).cloned())
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// Apply one edit to a document.
pub fn apply_edit(document: &mut Map<String, Value>, edit: &ConfigEdit) -> Result<(), ApiError> {
    match edit {
        ConfigEdit::Set { key, value } => {
            let parsed = match key_kind(key)? {
                ConfigKeyKind::Flag => Value::Bool(parse_flag(value)?),
                ConfigKeyKind::Text => Value::String(value.clone()),
                ConfigKeyKind::List => Value::Array(
                    value
                        .split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                ),
            };
            document.insert(key.clone(), parsed);
        }
        ConfigEdit::Unset { key } => {
            key_kind(key)?;
            if document.remove(key).is_none() {
                return Err(ApiError::UsageError(format!("Key '{}' is not set", key)));
            }
        }
        ConfigEdit::Add { key, value } => {
            require_list(key)?;
            let entry = document
                .entry(key.clone())
                .or_insert_with(|| Value::Array(default_list(key)));
            let list = entry
                .as_array_mut()
                .ok_or_else(|| ApiError::ConfigError(format!("Key '{}' is not a list", key)))?;
            let item = Value::String(value.clone());
            if list.contains(&item) {
                return Err(ApiError::UsageError(format!(
                    "'{}' is already in {}",
                    value, key
                )));
            }
            list.push(item);
        }
        ConfigEdit::Remove { key, value } => {
            require_list(key)?;
            let entry = document
                .entry(key.clone())
                .or_insert_with(|| Value::Array(default_list(key)));
            let list = entry
                .as_array_mut()
                .ok_or_else(|| ApiError::ConfigError(format!("Key '{}' is not a list", key)))?;
            let before = list.len();
            list.retain(|v| v.as_str() != Some(value.as_str()));
            if list.len() == before {
                return Err(ApiError::UsageError(format!("'{}' is not in {}", value, key)));
            }
        }
    }
    Ok(())
}

fn require_list(key: &str) -> Result<(), ApiError> {
    if key_kind(key)? != ConfigKeyKind::List {
        return Err(ApiError::UsageError(format!("Key '{}' is not a list", key)));
    }
    Ok(())
}

/// Read the global TOML file as a JSON document; a missing file is empty.
pub fn load_toml_document(path: &Path) -> Result<Map<String, Value>, ApiError> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        ApiError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| {
        ApiError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    match serde_json::to_value(table) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ApiError::ConfigError(format!(
            "Failed to convert {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write a JSON document back as TOML.
pub fn save_toml_document(path: &Path, document: &Map<String, Value>) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::ConfigError(format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    let content = toml::to_string_pretty(document)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content).map_err(|e| {
        ApiError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
    })
}

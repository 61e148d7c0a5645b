//! CLI Tooling
//!
//! Command-line interface for all offline versioning operations. Each subcommand maps to
//! exactly one workspace command service call.

use crate::config::editor::{apply_edit, load_toml_document, save_toml_document, ConfigEdit};
use crate::config::{ConfigLoader, SosConfig};
use crate::error::ApiError;
use crate::merge::MergeOperation;
use crate::repository::{find_repository_root, Repository};
use crate::tooling::prompt::PromptResolver;
use crate::tree::path::canonicalize_root;
use crate::workspace::{
    format_changes_text, format_commit_text, format_diff_text, format_json, format_log_text,
    format_ls_text, format_status_text, format_switch_text, format_tracking_text,
    format_update_text, BranchCreateRequest, CommitRequest, DeleteRequest, OfflineRequest,
    SwitchRequest, UpdateRequest, Workspace, WorkspaceCommandService,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// sos - offline version control next to your regular VCS
#[derive(Parser)]
#[command(name = "sos")]
#[command(about = "Subversion Offline Solution: offline branches and commits for any working tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working tree root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces the global configuration file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start offline versioning in the working tree
    Offline {
        /// Name of the first branch (default from configuration)
        name: Option<String>,
        /// Message of the initial revision
        #[arg(long, short)]
        message: Option<String>,
        /// Only version files matching tracking patterns
        #[arg(long)]
        track: bool,
        /// Like --track, patterns are cleared after every commit
        #[arg(long)]
        picky: bool,
        /// Compare files by content hash
        #[arg(long)]
        strict: bool,
        /// Compress stored file versions
        #[arg(long)]
        compress: bool,
        /// Discard an existing offline repository
        #[arg(long)]
        force: bool,
    },
    /// Stop offline versioning and remove its metadata
    Online {
        /// Remove even if branches are not in sync
        #[arg(long)]
        force: bool,
    },
    /// Create a branch from the working tree (or the latest revision with --last)
    Branch {
        name: Option<String>,
        /// Message of the branch's initial revision
        #[arg(long, short)]
        message: Option<String>,
        /// Clone the current branch's latest revision
        #[arg(long)]
        last: bool,
        /// Keep the current branch selected
        #[arg(long)]
        stay: bool,
    },
    /// Overwrite the working tree with a branch/revision
    Switch {
        /// Revision: branch/revision, branch/, /revision, revision or branch
        target: Option<String>,
        /// Discard local changes
        #[arg(long)]
        force: bool,
    },
    /// Merge a branch/revision into the working tree
    Update {
        target: Option<String>,
        /// File and line merge policy
        #[arg(long, value_enum, default_value = "both")]
        merge: MergeOperation,
        /// Character merge policy used when descending into a conflict
        #[arg(long, value_enum, default_value = "both")]
        char_merge: MergeOperation,
        /// Use incoming line endings
        #[arg(long)]
        eol: bool,
        /// Update even with local changes
        #[arg(long)]
        force: bool,
    },
    /// Record changes as a new revision of the current branch
    Commit {
        message: Option<String>,
        /// Also record the message as a unique tag
        #[arg(long)]
        tag: bool,
        /// Commit even without changes
        #[arg(long)]
        force: bool,
    },
    /// List changed files against a revision
    Changes {
        target: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show line differences against a revision
    Diff { target: Option<String> },
    /// Show repository status and branches
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the revisions of a branch
    Log {
        branch: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Add a tracking pattern (track/picky mode)
    Add { pattern: String },
    /// Remove a tracking pattern (track/picky mode)
    Rm { pattern: String },
    /// Rename a tracking pattern and the files it matches
    Mv {
        from: String,
        to: String,
        /// Only change the pattern, leave files alone
        #[arg(long)]
        soft: bool,
    },
    /// Delete a branch
    Delete {
        branch: String,
        /// Delete even with local changes
        #[arg(long)]
        force: bool,
    },
    /// List working tree files with status markers
    Ls {
        /// Glob over relative paths
        pattern: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Set a flag, text or list value (lists separated by ';')
    Set {
        key: String,
        value: String,
        /// Edit the repository-local configuration
        #[arg(long)]
        local: bool,
    },
    /// Remove a key
    Unset {
        key: String,
        #[arg(long)]
        local: bool,
    },
    /// Append to a list key
    Add {
        key: String,
        value: String,
        #[arg(long)]
        local: bool,
    },
    /// Remove from a list key
    Rm {
        key: String,
        value: String,
        #[arg(long)]
        local: bool,
    },
}

/// Static name of a command for log events.
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Offline { .. } => "offline",
        Commands::Online { .. } => "online",
        Commands::Branch { .. } => "branch",
        Commands::Switch { .. } => "switch",
        Commands::Update { .. } => "update",
        Commands::Commit { .. } => "commit",
        Commands::Changes { .. } => "changes",
        Commands::Diff { .. } => "diff",
        Commands::Status { .. } => "status",
        Commands::Log { .. } => "log",
        Commands::Add { .. } => "add",
        Commands::Rm { .. } => "rm",
        Commands::Mv { .. } => "mv",
        Commands::Delete { .. } => "delete",
        Commands::Ls { .. } => "ls",
        Commands::Config { .. } => "config",
    }
}

/// CLI context: the resolved working tree and its effective configuration.
pub struct CliContext {
    workspace: Workspace,
    config_path: Option<PathBuf>,
}

impl CliContext {
    /// Resolve the repository root above `workspace_root` and load configuration.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let root = canonicalize_root(&workspace_root)?;
        let root = find_repository_root(&root).unwrap_or(root);
        let config = if let Some(cfg_path) = &config_path {
            ConfigLoader::load_from_file(cfg_path, &root)?
        } else {
            ConfigLoader::load(&root)?
        };
        Ok(Self {
            workspace: Workspace::new(&root, config)?,
            config_path,
        })
    }

    /// Context with an explicit configuration, bypassing file and environment sources.
    pub fn with_config(workspace_root: PathBuf, config: SosConfig) -> Result<Self, ApiError> {
        Ok(Self {
            workspace: Workspace::new(&workspace_root, config)?,
            config_path: None,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &SosConfig {
        self.workspace.config()
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        let ws = &self.workspace;
        match command {
            Commands::Offline {
                name,
                message,
                track,
                picky,
                strict,
                compress,
                force,
            } => {
                let result = WorkspaceCommandService::offline(
                    ws,
                    &OfflineRequest {
                        name: name.clone(),
                        message: message.clone(),
                        track: *track,
                        picky: *picky,
                        strict: *strict,
                        compress: *compress,
                        force: *force,
                    },
                )?;
                Ok(format!(
                    "Offline repository created: branch {} '{}' with {} file(s){}",
                    result.branch,
                    result.name,
                    result.files,
                    if result.compressed { " (compressed)" } else { "" }
                ))
            }
            Commands::Online { force } => {
                let result = WorkspaceCommandService::online(ws, *force)?;
                Ok(format!(
                    "Offline metadata removed: {}",
                    result.removed.display()
                ))
            }
            Commands::Branch {
                name,
                message,
                last,
                stay,
            } => {
                let result = WorkspaceCommandService::branch(
                    ws,
                    &BranchCreateRequest {
                        name: name.clone(),
                        message: message.clone(),
                        last: *last,
                        stay: *stay,
                    },
                )?;
                Ok(format!(
                    "Created branch {}{} with {} file(s){}",
                    result.branch,
                    result.name.map(|n| format!(" '{}'", n)).unwrap_or_default(),
                    result.files,
                    if result.switched { ", now current" } else { "" }
                ))
            }
            Commands::Switch { target, force } => {
                let result = WorkspaceCommandService::switch(
                    ws,
                    &SwitchRequest {
                        target: target.clone(),
                        force: *force,
                    },
                )?;
                Ok(format_switch_text(&result))
            }
            Commands::Update {
                target,
                merge,
                char_merge,
                eol,
                force,
            } => {
                let mut resolver = PromptResolver;
                let result = WorkspaceCommandService::update(
                    ws,
                    &UpdateRequest {
                        target: target.clone(),
                        merge: *merge,
                        char_merge: *char_merge,
                        eol: *eol,
                        force: *force,
                    },
                    &mut resolver,
                )?;
                Ok(format_update_text(&result))
            }
            Commands::Commit {
                message,
                tag,
                force,
            } => {
                let result = WorkspaceCommandService::commit(
                    ws,
                    &CommitRequest {
                        message: message.clone(),
                        tag: *tag,
                        force: *force,
                    },
                )?;
                Ok(format_commit_text(&result))
            }
            Commands::Changes { target, format } => {
                let result = WorkspaceCommandService::changes(ws, target.as_deref())?;
                match format.as_str() {
                    "json" => Ok(format_json(&result)),
                    _ => Ok(format_changes_text(&result)),
                }
            }
            Commands::Diff { target } => {
                let result = WorkspaceCommandService::diff(ws, target.as_deref())?;
                Ok(format_diff_text(&result))
            }
            Commands::Status { format } => {
                let result = WorkspaceCommandService::status(ws)?;
                match format.as_str() {
                    "json" => Ok(format_json(&result)),
                    _ => Ok(format_status_text(&result)),
                }
            }
            Commands::Log { branch, format } => {
                let result = WorkspaceCommandService::log(ws, branch.as_deref())?;
                match format.as_str() {
                    "json" => Ok(format_json(&result)),
                    _ => Ok(format_log_text(&result)),
                }
            }
            Commands::Add { pattern } => {
                Ok(format_tracking_text(&WorkspaceCommandService::add(ws, pattern)?))
            }
            Commands::Rm { pattern } => {
                Ok(format_tracking_text(&WorkspaceCommandService::rm(ws, pattern)?))
            }
            Commands::Mv { from, to, soft } => Ok(format_tracking_text(
                &WorkspaceCommandService::mv(ws, from, to, *soft)?,
            )),
            Commands::Delete { branch, force } => {
                let result = WorkspaceCommandService::delete(
                    ws,
                    &DeleteRequest {
                        branch: branch.clone(),
                        force: *force,
                    },
                )?;
                Ok(format!(
                    "Deleted branch {}; current branch is {}",
                    result.branch, result.current
                ))
            }
            Commands::Ls { pattern, format } => {
                let result = WorkspaceCommandService::ls(ws, pattern.as_deref())?;
                match format.as_str() {
                    "json" => Ok(format_json(&result)),
                    _ => Ok(format_ls_text(&result)),
                }
            }
            Commands::Config { command } => self.handle_config_command(command),
        }
    }

    /// Handle configuration show/edit commands
    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        let (edit, local) = match command {
            ConfigCommands::Show { format } => {
                return match format.as_str() {
                    "json" => Ok(format_json(self.config())),
                    _ => toml::to_string_pretty(self.config()).map_err(|e| {
                        ApiError::ConfigError(format!("Failed to serialize config: {}", e))
                    }),
                };
            }
            ConfigCommands::Set { key, value, local } => (
                ConfigEdit::Set {
                    key: key.clone(),
                    value: value.clone(),
                },
                *local,
            ),
            ConfigCommands::Unset { key, local } => (ConfigEdit::Unset { key: key.clone() }, *local),
            ConfigCommands::Add { key, value, local } => (
                ConfigEdit::Add {
                    key: key.clone(),
                    value: value.clone(),
                },
                *local,
            ),
            ConfigCommands::Rm { key, value, local } => (
                ConfigEdit::Remove {
                    key: key.clone(),
                    value: value.clone(),
                },
                *local,
            ),
        };

        if local {
            let mut repository = Repository::open(self.workspace.root())?;
            apply_edit(&mut repository.record_mut().config, &edit)?;
            repository.save()?;
            return Ok("Repository-local configuration updated".to_string());
        }
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => crate::config::xdg::global_config_file()?,
        };
        let mut document = load_toml_document(&path)?;
        apply_edit(&mut document, &edit)?;
        save_toml_document(&path, &document)?;
        Ok(format!("Configuration updated: {}", path.display()))
    }
}

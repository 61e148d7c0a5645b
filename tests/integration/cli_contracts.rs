use crate::integration::support::write;
use clap::Parser;
use serde_json::Value;
use sos::config::SosConfig;
use sos::repository::Repository;
use sos::tooling::{Cli, CliContext};
use tempfile::TempDir;

fn context(temp: &TempDir) -> CliContext {
    CliContext::with_config(temp.path().to_path_buf(), SosConfig::default()).unwrap()
}

fn run(ctx: &CliContext, args: &[&str]) -> Result<String, sos::error::ApiError> {
    let cli = Cli::try_parse_from(std::iter::once("sos").chain(args.iter().copied())).unwrap();
    ctx.execute(&cli.command)
}

#[test]
fn commands_outside_a_repository_are_usage_errors() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let err = run(&ctx, &["status"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn offline_commit_and_log_through_the_cli() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "readme.txt", "hello");
    let ctx = context(&temp);

    let out = run(&ctx, &["offline", "main", "-m", "start"]).unwrap();
    assert!(out.contains("branch 0 'main'"), "{}", out);

    write(temp.path(), "readme.txt", "hello again");
    run(&ctx, &["commit", "second", "--tag"]).unwrap();

    let log: Value = serde_json::from_str(&run(&ctx, &["log", "--format", "json"]).unwrap()).unwrap();
    let entries = log["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["message"], "start");
    assert_eq!(entries[1]["tagged"], true);
    assert_eq!(entries[1]["modifications"], 1);
}

#[test]
fn status_and_changes_render_as_json() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ctx = context(&temp);
    run(&ctx, &["offline"]).unwrap();
    write(temp.path(), "b.txt", "beta");

    let status: Value =
        serde_json::from_str(&run(&ctx, &["status", "--format", "json"]).unwrap()).unwrap();
    assert_eq!(status["branch"], 0);
    assert_eq!(status["pending_additions"], 1);
    assert_eq!(status["branches"][0]["name"], "trunk");
    assert_eq!(status["branches"][0]["current"], true);

    let changes: Value =
        serde_json::from_str(&run(&ctx, &["changes", "--format", "json"]).unwrap()).unwrap();
    assert!(changes["changes"]["additions"]["b.txt"].is_object());
    assert!(changes["changes"]["deletions"].as_object().unwrap().is_empty());
}

#[test]
fn unknown_revision_exits_with_usage_code() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ctx = context(&temp);
    run(&ctx, &["offline"]).unwrap();

    let err = run(&ctx, &["switch", "nowhere"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    let err = run(&ctx, &["delete", "trunk", "--force"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn local_config_edits_are_stored_in_the_repository() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ctx = context(&temp);
    run(&ctx, &["offline"]).unwrap();

    run(&ctx, &["config", "set", "strict", "on", "--local"]).unwrap();
    run(&ctx, &["config", "add", "bintype", "*.dat", "--local"]).unwrap();

    let repository = Repository::open(temp.path()).unwrap();
    let config = &repository.record().config;
    assert_eq!(config["strict"], Value::Bool(true));
    assert!(config["bintype"]
        .as_array()
        .unwrap()
        .contains(&Value::String("*.dat".to_string())));

    let err = run(&ctx, &["config", "set", "no_such_key", "1", "--local"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn config_show_renders_effective_settings() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let shown: Value =
        serde_json::from_str(&run(&ctx, &["config", "show", "--format", "json"]).unwrap()).unwrap();
    assert_eq!(shown["default_branch"], "trunk");
    assert_eq!(shown["strict"], false);
}

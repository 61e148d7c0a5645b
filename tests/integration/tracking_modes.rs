use crate::integration::support::{offline, read, workspace, write};
use sos::error::ApiError;
use sos::repository::Repository;
use sos::workspace::{
    CommitRequest, LsMarker, OfflineRequest, SwitchRequest, WorkspaceCommandService,
};
use tempfile::TempDir;

fn tracked_offline(temp: &TempDir, picky: bool) -> sos::workspace::Workspace {
    let ws = workspace(temp);
    offline(
        &ws,
        OfflineRequest {
            track: !picky,
            picky,
            ..OfflineRequest::default()
        },
    );
    ws
}

#[test]
fn track_mode_versions_only_matching_paths() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    write(temp.path(), "b.bin", "beta");
    let ws = tracked_offline(&temp, false);

    let repository = Repository::open(temp.path()).unwrap();
    assert!(repository.path_set(0, 0).unwrap().is_empty());

    let added = WorkspaceCommandService::add(&ws, "*.txt").unwrap();
    assert_eq!(added.patterns, vec!["*.txt"]);
    let result = WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();
    assert_eq!(result.additions, 1);

    let repository = Repository::open(temp.path()).unwrap();
    let paths = repository.head_path_set().unwrap();
    assert!(paths.contains_key("a.txt"));
    assert!(!paths.contains_key("b.bin"));
    assert_eq!(repository.tracking_patterns(0), vec!["*.txt"]);

    let listing = WorkspaceCommandService::ls(&ws, None).unwrap();
    let markers: Vec<_> = listing
        .entries
        .iter()
        .map(|e| (e.path.as_str(), e.marker))
        .collect();
    assert_eq!(
        markers,
        vec![("a.txt", LsMarker::Tracked), ("b.bin", LsMarker::Unchanged)]
    );
}

#[test]
fn duplicate_and_unknown_patterns_are_rejected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ws = tracked_offline(&temp, false);

    WorkspaceCommandService::add(&ws, "*.txt").unwrap();
    assert!(matches!(
        WorkspaceCommandService::add(&ws, "*.txt"),
        Err(ApiError::UsageError(_))
    ));
    assert!(matches!(
        WorkspaceCommandService::rm(&ws, "*.md"),
        Err(ApiError::UsageError(_))
    ));
    let removed = WorkspaceCommandService::rm(&ws, "*.txt").unwrap();
    assert!(removed.patterns.is_empty());
}

#[test]
fn picky_mode_needs_patterns_and_clears_them_after_commit() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    write(temp.path(), "b.txt", "beta");
    let ws = tracked_offline(&temp, true);

    let err = WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap_err();
    assert!(matches!(err, ApiError::UsageError(_)));

    WorkspaceCommandService::add(&ws, "a.txt").unwrap();
    let result = WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();
    assert_eq!(result.additions, 1);

    let repository = Repository::open(temp.path()).unwrap();
    assert!(repository.tracking_patterns(0).is_empty());
    let paths = repository.head_path_set().unwrap();
    assert!(paths.contains_key("a.txt"));
    assert!(!paths.contains_key("b.txt"));
}

#[test]
fn mv_renames_matching_files_and_pattern() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/one.txt", "1");
    write(temp.path(), "src/two.txt", "22");
    write(temp.path(), "src/keep.rs", "fn main() {}");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "src/*.txt").unwrap();

    let moved = WorkspaceCommandService::mv(&ws, "src/*.txt", "docs/*.txt", false).unwrap();
    assert_eq!(moved.moved, 2);
    assert_eq!(moved.patterns, vec!["docs/*.txt"]);
    assert_eq!(read(temp.path(), "docs/one.txt"), "1");
    assert_eq!(read(temp.path(), "docs/two.txt"), "22");
    assert!(!temp.path().join("src/one.txt").exists());
    assert!(temp.path().join("src/keep.rs").exists());
}

#[test]
fn mv_soft_only_changes_the_pattern() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/one.txt", "1");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "src/*.txt").unwrap();

    let moved = WorkspaceCommandService::mv(&ws, "src/*.txt", "lib/*.txt", true).unwrap();
    assert_eq!(moved.moved, 0);
    assert!(temp.path().join("src/one.txt").exists());
}

#[test]
fn mv_rejects_mismatched_wildcards_and_existing_targets() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/one.txt", "1");
    write(temp.path(), "docs/one.txt", "already here");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "src/*.txt").unwrap();

    assert!(matches!(
        WorkspaceCommandService::mv(&ws, "src/*.txt", "docs/?.txt", false),
        Err(ApiError::UsageError(_))
    ));
    assert!(matches!(
        WorkspaceCommandService::mv(&ws, "src/*.txt", "docs/*.txt", false),
        Err(ApiError::UsageError(_))
    ));
    assert_eq!(read(temp.path(), "src/one.txt"), "1");
}

#[test]
fn mv_skips_ignored_files() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "data/a.txt", "a");
    write(temp.path(), "data/old.bak", "backup");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "data/*").unwrap();

    let moved = WorkspaceCommandService::mv(&ws, "data/*", "archive/*", false).unwrap();
    assert_eq!(moved.moved, 1);
    assert_eq!(read(temp.path(), "archive/a.txt"), "a");
    assert_eq!(read(temp.path(), "data/old.bak"), "backup");
    assert!(!temp.path().join("archive/old.bak").exists());
}

#[test]
fn mv_rejects_colliding_targets() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a_b-c", "first");
    write(temp.path(), "a-b_c", "second");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "*_*").unwrap();

    assert!(matches!(
        WorkspaceCommandService::mv(&ws, "*_*", "*-*", false),
        Err(ApiError::UsageError(_))
    ));
    assert_eq!(read(temp.path(), "a_b-c"), "first");
    assert_eq!(read(temp.path(), "a-b_c"), "second");
    assert!(!temp.path().join("a-b-c").exists());
}

#[test]
fn pattern_edits_need_a_tracking_repository() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    assert!(matches!(
        WorkspaceCommandService::add(&ws, "*.txt"),
        Err(ApiError::UsageError(_))
    ));
    assert!(matches!(
        WorkspaceCommandService::mv(&ws, "*.txt", "*.md", true),
        Err(ApiError::UsageError(_))
    ));
}

#[test]
fn switch_in_track_mode_leaves_untracked_files_alone() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ws = tracked_offline(&temp, false);
    WorkspaceCommandService::add(&ws, "*.txt").unwrap();
    WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();

    write(temp.path(), "notes.md", "untracked scratch");
    write(temp.path(), "a.txt", "alpha changed");
    let result = WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: None,
            force: true,
        },
    )
    .unwrap();
    assert_eq!(result.files_touched, 1);
    assert_eq!(read(temp.path(), "a.txt"), "alpha");
    assert_eq!(read(temp.path(), "notes.md"), "untracked scratch");
}

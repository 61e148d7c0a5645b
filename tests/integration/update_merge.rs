use crate::integration::support::{offline, read, workspace, write};
use sos::error::ApiError;
use sos::merge::{ConflictChoice, FixedResolver, MergeOperation, ScriptedResolver};
use sos::workspace::{
    BranchCreateRequest, CommitRequest, OfflineRequest, SwitchRequest, UpdateRequest, Workspace,
    WorkspaceCommandService,
};
use tempfile::TempDir;

const TRUNK: &str = "a\nb\ncc\nd";
const DEV: &str = "a\nb\neee\nd";

/// Trunk and a `dev` branch that changed one line and added a file; trunk is checked out.
fn diverged(temp: &TempDir) -> Workspace {
    write(temp.path(), "text.txt", TRUNK);
    write(temp.path(), "trunk-only.txt", "stays on trunk");
    let ws = workspace(temp);
    offline(&ws, OfflineRequest::default());
    WorkspaceCommandService::branch(
        &ws,
        &BranchCreateRequest {
            name: Some("dev".to_string()),
            ..BranchCreateRequest::default()
        },
    )
    .unwrap();
    write(temp.path(), "text.txt", DEV);
    write(temp.path(), "new.txt", "from dev");
    std::fs::remove_file(temp.path().join("trunk-only.txt")).unwrap();
    WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();
    WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: Some("trunk".to_string()),
            force: false,
        },
    )
    .unwrap();
    assert_eq!(read(temp.path(), "text.txt"), TRUNK);
    ws
}

fn update(ws: &Workspace, merge: MergeOperation) -> sos::workspace::UpdateResult {
    WorkspaceCommandService::update(
        ws,
        &UpdateRequest {
            target: Some("dev".to_string()),
            merge,
            ..UpdateRequest::default()
        },
        &mut FixedResolver(ConflictChoice::Mine),
    )
    .unwrap()
}

#[test]
fn insert_keeps_both_sides() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);

    let result = update(&ws, MergeOperation::Insert);
    assert_eq!(read(temp.path(), "text.txt"), "a\nb\neee\ncc\nd");
    assert_eq!(read(temp.path(), "new.txt"), "from dev");
    assert_eq!(read(temp.path(), "trunk-only.txt"), "stays on trunk");
    assert_eq!((result.merged, result.restored, result.kept), (1, 1, 1));

    // The current branch stays selected
    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!(status.branch, 0);
}

#[test]
fn both_takes_the_incoming_text() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);

    let result = update(&ws, MergeOperation::Both);
    assert_eq!(read(temp.path(), "text.txt"), DEV);
    assert_eq!(read(temp.path(), "new.txt"), "from dev");
    assert!(!temp.path().join("trunk-only.txt").exists());
    assert_eq!((result.merged, result.restored, result.removed), (1, 1, 1));
}

#[test]
fn remove_drops_incoming_changes() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);

    let result = update(&ws, MergeOperation::Remove);
    assert_eq!(read(temp.path(), "text.txt"), "a\nb\nd");
    assert!(!temp.path().join("new.txt").exists());
    assert!(!temp.path().join("trunk-only.txt").exists());
    assert_eq!(result.restored, 0);
    assert_eq!(result.removed, 1);
}

#[test]
fn ask_consults_the_resolver_per_conflict() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);

    let mut resolver = ScriptedResolver::new([ConflictChoice::Mine]);
    let result = WorkspaceCommandService::update(
        &ws,
        &UpdateRequest {
            target: Some("dev".to_string()),
            merge: MergeOperation::Ask,
            ..UpdateRequest::default()
        },
        &mut resolver,
    )
    .unwrap();
    assert_eq!(resolver.asked(), 1);
    assert_eq!(read(temp.path(), "text.txt"), TRUNK);
    assert_eq!(result.kept, 1);
}

#[test]
fn ask_without_answers_is_a_merge_conflict() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);

    let err = WorkspaceCommandService::update(
        &ws,
        &UpdateRequest {
            target: Some("dev".to_string()),
            merge: MergeOperation::Ask,
            ..UpdateRequest::default()
        },
        &mut ScriptedResolver::new(Vec::new()),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::MergeConflict(_)));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn binary_files_are_replaced_whole() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "image.bin", [0u8, 1, 2, 3]);
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());
    WorkspaceCommandService::branch(
        &ws,
        &BranchCreateRequest {
            name: Some("dev".to_string()),
            ..BranchCreateRequest::default()
        },
    )
    .unwrap();
    write(temp.path(), "image.bin", [0u8, 9, 9, 9, 9]);
    WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();
    WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: Some("trunk".to_string()),
            force: false,
        },
    )
    .unwrap();

    let kept = update(&ws, MergeOperation::Remove);
    assert_eq!(kept.kept, 1);
    assert_eq!(std::fs::read(temp.path().join("image.bin")).unwrap(), [0u8, 1, 2, 3]);

    let taken = update(&ws, MergeOperation::Both);
    assert_eq!(taken.merged, 1);
    assert_eq!(
        std::fs::read(temp.path().join("image.bin")).unwrap(),
        [0u8, 9, 9, 9, 9]
    );
}

#[test]
fn update_refuses_dirty_tree() {
    let temp = TempDir::new().unwrap();
    let ws = diverged(&temp);
    write(temp.path(), "text.txt", "local edit in progress");

    let err = WorkspaceCommandService::update(
        &ws,
        &UpdateRequest {
            target: Some("dev".to_string()),
            ..UpdateRequest::default()
        },
        &mut FixedResolver(ConflictChoice::Mine),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::UsageError(_)));
}

#[test]
fn update_unions_tracking_patterns() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "alpha");
    let ws = workspace(&temp);
    offline(
        &ws,
        OfflineRequest {
            track: true,
            ..OfflineRequest::default()
        },
    );
    WorkspaceCommandService::add(&ws, "*.txt").unwrap();
    WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();

    WorkspaceCommandService::branch(
        &ws,
        &BranchCreateRequest {
            name: Some("docs".to_string()),
            ..BranchCreateRequest::default()
        },
    )
    .unwrap();
    WorkspaceCommandService::add(&ws, "*.md").unwrap();
    write(temp.path(), "notes.md", "# notes");
    WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap();

    WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: Some("trunk".to_string()),
            force: false,
        },
    )
    .unwrap();
    assert!(!temp.path().join("notes.md").exists());

    let result = WorkspaceCommandService::update(
        &ws,
        &UpdateRequest {
            target: Some("docs".to_string()),
            ..UpdateRequest::default()
        },
        &mut FixedResolver(ConflictChoice::Mine),
    )
    .unwrap();
    assert_eq!(result.patterns_added, 1);
    assert_eq!(read(temp.path(), "notes.md"), "# notes");

    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!(status.branch, 0);
    assert_eq!(status.tracked, vec!["*.txt", "*.md"]);
}

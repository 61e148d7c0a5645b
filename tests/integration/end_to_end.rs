use crate::integration::support::{offline, read, workspace, write};
use sos::error::ApiError;
use sos::history::{sequential_path_set, RevisionReplay};
use sos::repository::Repository;
use sos::store::persistence::{load_revision, MetaLayout};
use sos::tree::hasher::hash_path;
use sos::workspace::{
    BranchCreateRequest, CommitRequest, DeleteRequest, OfflineRequest, SwitchRequest,
    WorkspaceCommandService,
};
use std::fs;
use tempfile::TempDir;

fn commit(ws: &sos::workspace::Workspace, message: &str) -> sos::workspace::CommitResult {
    WorkspaceCommandService::commit(
        ws,
        &CommitRequest {
            message: Some(message.to_string()),
            ..CommitRequest::default()
        },
    )
    .unwrap()
}

fn switch(ws: &sos::workspace::Workspace, target: &str) -> usize {
    WorkspaceCommandService::switch(
        ws,
        &SwitchRequest {
            target: Some(target.to_string()),
            force: false,
        },
    )
    .unwrap()
    .files_touched
}

#[test]
fn offline_commit_and_reconstruct_single_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "x".repeat(100));
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    let layout = MetaLayout::new(temp.path());
    let r0 = load_revision(&layout, 0, 0).unwrap();
    assert_eq!(r0.len(), 1);
    assert_eq!(r0["f1"].size, Some(100));

    write(temp.path(), "f1", format!("{}{}", "x".repeat(5), "y".repeat(5)));
    let result = commit(&ws, "second");
    assert_eq!((result.branch, result.revision), (0, 1));
    assert_eq!(result.modifications, 1);

    let steps: Vec<_> = RevisionReplay::new(&layout, 0, 1)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(steps[1].changes.modifications.len(), 1);
    assert!(steps[1].changes.modifications.contains_key("f1"));
    assert!(steps[1].changes.additions.is_empty());
    assert_eq!(load_revision(&layout, 0, 1).unwrap().len(), 1);

    let paths = sequential_path_set(&layout, 0, 1).unwrap();
    assert_eq!(paths["f1"].size, Some(10));
}

#[test]
fn reconstruction_matches_working_tree_after_each_commit() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "one");
    write(temp.path(), "dir/b.txt", "two two");
    write(temp.path(), "empty.txt", "");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    fs::remove_file(temp.path().join("a.txt")).unwrap();
    write(temp.path(), "dir/c.txt", "three");
    commit(&ws, "remove a, add c");

    write(temp.path(), "a.txt", "one is back");
    write(temp.path(), "dir/b.txt", "2");
    commit(&ws, "restore a");

    let layout = MetaLayout::new(temp.path());
    let reconstructed = sequential_path_set(&layout, 0, 2).unwrap();
    let keys: Vec<&String> = reconstructed.keys().collect();
    assert_eq!(keys, vec!["a.txt", "dir/b.txt", "dir/c.txt", "empty.txt"]);
    assert_eq!(reconstructed["a.txt"].size, Some(11));
    assert_eq!(reconstructed["a.txt"].path_hash, hash_path("a.txt"));
    assert_eq!(reconstructed["dir/b.txt"].size, Some(1));
    assert!(!layout
        .blob_path(0, 0, &reconstructed["empty.txt"].path_hash)
        .exists());

    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!(status.revision, 2);
    assert_eq!(
        status.pending_additions + status.pending_deletions + status.pending_modifications,
        0
    );
}

#[test]
fn replayed_revision_reports_what_was_detected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "keep", "k");
    write(temp.path(), "edit", "short");
    write(temp.path(), "gone", "g");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    write(temp.path(), "edit", "much longer now");
    write(temp.path(), "fresh", "new file");
    fs::remove_file(temp.path().join("gone")).unwrap();
    let detected = WorkspaceCommandService::changes(&ws, None).unwrap().changes;
    commit(&ws, "mixed");

    let layout = MetaLayout::new(temp.path());
    let steps: Vec<_> = RevisionReplay::new(&layout, 0, 1)
        .collect::<Result<_, _>>()
        .unwrap();
    let replayed = &steps[1].changes;
    let keys = |m: &std::collections::BTreeMap<String, _>| m.keys().cloned().collect::<Vec<_>>();
    assert_eq!(keys(&replayed.additions), keys(&detected.additions));
    assert_eq!(keys(&replayed.deletions), keys(&detected.deletions));
    assert_eq!(keys(&replayed.modifications), keys(&detected.modifications));
    assert_eq!(keys(&replayed.modifications), vec!["edit"]);

    let mut rebuilt = steps[0].paths.clone();
    sos::store::apply_delta(&mut rebuilt, &replayed.to_delta());
    assert_eq!(rebuilt, steps[1].paths);
    assert_eq!(
        steps[1].paths,
        Repository::open(temp.path()).unwrap().head_path_set().unwrap()
    );
}

#[test]
fn switching_to_current_revision_touches_nothing() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "content");
    write(temp.path(), "sub/f2", "more content");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    assert_eq!(switch(&ws, "trunk"), 0);
    let result = WorkspaceCommandService::switch(&ws, &SwitchRequest::default()).unwrap();
    assert_eq!(result.files_touched, 0);
}

#[test]
fn branch_switch_restores_each_side() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "trunk version");
    write(temp.path(), "shared", "same everywhere");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    let created = WorkspaceCommandService::branch(
        &ws,
        &BranchCreateRequest {
            name: Some("dev".to_string()),
            ..BranchCreateRequest::default()
        },
    )
    .unwrap();
    assert_eq!(created.branch, 1);
    assert!(created.switched);

    write(temp.path(), "f1", "development version, longer");
    write(temp.path(), "dev-only", "d");
    commit(&ws, "dev work");

    assert_eq!(switch(&ws, "trunk"), 2);
    assert_eq!(read(temp.path(), "f1"), "trunk version");
    assert!(!temp.path().join("dev-only").exists());
    assert_eq!(read(temp.path(), "shared"), "same everywhere");

    assert_eq!(switch(&ws, "dev"), 2);
    assert_eq!(read(temp.path(), "f1"), "development version, longer");
    assert_eq!(read(temp.path(), "dev-only"), "d");

    // Revision zero of dev is the snapshot taken when branching
    switch(&ws, "dev/0");
    assert_eq!(read(temp.path(), "f1"), "trunk version");
}

#[test]
fn switch_refuses_dirty_tree_unless_forced() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "base");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());
    write(temp.path(), "f1", "local edit");

    let err = WorkspaceCommandService::switch(&ws, &SwitchRequest::default()).unwrap_err();
    assert!(matches!(err, ApiError::UsageError(_)));

    let forced = WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: None,
            force: true,
        },
    )
    .unwrap();
    assert_eq!(forced.files_touched, 1);
    assert_eq!(read(temp.path(), "f1"), "base");
}

#[test]
fn zero_byte_files_are_restored_without_blobs() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "empty", "");
    write(temp.path(), "full", "x");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());
    fs::remove_file(temp.path().join("empty")).unwrap();

    WorkspaceCommandService::switch(
        &ws,
        &SwitchRequest {
            target: None,
            force: true,
        },
    )
    .unwrap();
    assert!(temp.path().join("empty").is_file());
    assert_eq!(fs::metadata(temp.path().join("empty")).unwrap().len(), 0);
}

#[test]
fn only_branch_cannot_be_deleted_even_with_force() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "x");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    let err = WorkspaceCommandService::delete(
        &ws,
        &DeleteRequest {
            branch: "trunk".to_string(),
            force: true,
        },
    )
    .unwrap_err();
    assert!(err.is_repository_state());
    assert_eq!(err.exit_code(), 2);
    assert!(MetaLayout::new(temp.path()).branch_folder(0).is_dir());
}

#[test]
fn deleting_current_branch_moves_to_remaining_branch() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "trunk");
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
    write(temp.path(), "f1", "dev changes");
    commit(&ws, "dev");

    let result = WorkspaceCommandService::delete(
        &ws,
        &DeleteRequest {
            branch: "dev".to_string(),
            force: false,
        },
    )
    .unwrap();
    assert_eq!((result.branch, result.current), (1, 0));
    assert_eq!(read(temp.path(), "f1"), "trunk");

    // Branch numbers are not reused
    let next = WorkspaceCommandService::branch(&ws, &BranchCreateRequest::default()).unwrap();
    assert_eq!(next.branch, 2);
}

#[test]
fn deleting_other_branch_keeps_current_branch_and_tree() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "trunk");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());
    for name in ["a", "b"] {
        WorkspaceCommandService::branch(
            &ws,
            &BranchCreateRequest {
                name: Some(name.to_string()),
                stay: true,
                ..BranchCreateRequest::default()
            },
        )
        .unwrap();
    }
    switch(&ws, "b");
    write(temp.path(), "f1", "changed on b");
    commit(&ws, "b work");
    switch(&ws, "trunk");

    let result = WorkspaceCommandService::delete(
        &ws,
        &DeleteRequest {
            branch: "a".to_string(),
            force: false,
        },
    )
    .unwrap();
    assert_eq!((result.branch, result.current), (1, 0));
    assert_eq!(read(temp.path(), "f1"), "trunk");
    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!(status.branch, 0);
    assert_eq!(status.pending_modifications, 0);

    write(temp.path(), "f1", "trunk moves on");
    let committed = commit(&ws, "trunk work");
    assert_eq!((committed.branch, committed.revision), (0, 1));
}

#[test]
fn switch_leaves_tree_clean_when_only_timestamps_differ() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f", "same");
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

    let recorded = Repository::open(temp.path()).unwrap().path_set(1, 0).unwrap()["f"].mtime;
    sos::store::blob::set_mtime(&temp.path().join("f"), recorded - 10_000).unwrap();
    let touched = commit(&ws, "touch");
    assert_eq!(touched.modifications, 1);

    assert_eq!(switch(&ws, "trunk"), 0);
    assert_eq!(read(temp.path(), "f"), "same");
    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!(
        status.pending_additions + status.pending_deletions + status.pending_modifications,
        0
    );

    assert_eq!(switch(&ws, "dev"), 0);
    let status = WorkspaceCommandService::status(&ws).unwrap();
    assert_eq!((status.branch, status.pending_modifications), (1, 0));
}

#[test]
fn commit_refuses_to_overwrite_colliding_blob() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "original");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    let layout = MetaLayout::new(temp.path());
    let blob = layout.blob_path(0, 1, &hash_path("f1"));
    fs::create_dir_all(blob.parent().unwrap()).unwrap();
    fs::write(&blob, "something else entirely").unwrap();

    write(temp.path(), "f1", "modified content");
    let err = WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap_err();
    assert!(err.is_repository_state());
    assert_eq!(fs::read_to_string(&blob).unwrap(), "something else entirely");
    assert!(!layout.revision_file(0, 1).exists());
    assert_eq!(Repository::open(temp.path()).unwrap().commits(0).len(), 1);
}

#[test]
fn commit_without_changes_needs_force() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "x");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    let err = WorkspaceCommandService::commit(&ws, &CommitRequest::default()).unwrap_err();
    assert!(matches!(err, ApiError::UsageError(_)));

    let forced = WorkspaceCommandService::commit(
        &ws,
        &CommitRequest {
            force: true,
            ..CommitRequest::default()
        },
    )
    .unwrap();
    assert_eq!(forced.revision, 1);
    assert_eq!(forced.additions + forced.deletions + forced.modifications, 0);
}

#[test]
fn tags_are_unique_and_resolve_to_revisions() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "1");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    write(temp.path(), "f1", "22");
    WorkspaceCommandService::commit(
        &ws,
        &CommitRequest {
            message: Some("v1".to_string()),
            tag: true,
            force: false,
        },
    )
    .unwrap();

    write(temp.path(), "f1", "333");
    let err = WorkspaceCommandService::commit(
        &ws,
        &CommitRequest {
            message: Some("v1".to_string()),
            tag: true,
            force: false,
        },
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::UsageError(_)));
    commit(&ws, "third");

    let repository = Repository::open(temp.path()).unwrap();
    assert_eq!(repository.parse_revision_string(Some("v1")).unwrap(), (0, 1));
    assert_eq!(repository.parse_revision_string(Some("/-1")).unwrap(), (0, 2));

    let log = WorkspaceCommandService::log(&ws, None).unwrap();
    assert_eq!(log.entries.len(), 3);
    assert!(log.entries[1].tagged);
    assert_eq!(log.entries[0].additions, 1);
    assert_eq!(log.entries[2].modifications, 1);
}

#[test]
fn changes_and_diff_against_head() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "text.txt", "a\nb\ncc\nd");
    write(temp.path(), "crlf.txt", "one\ntwo\n");
    write(temp.path(), "gone.txt", "bye");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());

    write(temp.path(), "text.txt", "a\nb\neee\nd");
    write(temp.path(), "crlf.txt", "one\r\ntwo\r\n");
    write(temp.path(), "new.txt", "hello");
    fs::remove_file(temp.path().join("gone.txt")).unwrap();

    let changes = WorkspaceCommandService::changes(&ws, None).unwrap().changes;
    assert!(changes.additions.contains_key("new.txt"));
    assert!(changes.deletions.contains_key("gone.txt"));
    assert!(changes.modifications.contains_key("text.txt"));

    let diff = WorkspaceCommandService::diff(&ws, None).unwrap();
    let kinds: std::collections::BTreeMap<_, _> =
        diff.files.iter().map(|f| (f.path.as_str(), &f.kind)).collect();
    assert_eq!(kinds["crlf.txt"], &sos::workspace::FileDiffKind::LineEndingsOnly);
    assert_eq!(kinds["new.txt"], &sos::workspace::FileDiffKind::Added);
    assert!(matches!(
        kinds["text.txt"],
        sos::workspace::FileDiffKind::Changed(_)
    ));
}

#[test]
fn online_requires_sync_or_force() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "f1", "x");
    let ws = workspace(&temp);
    offline(&ws, OfflineRequest::default());
    WorkspaceCommandService::online(&ws, false).unwrap();
    assert!(!temp.path().join(".sos").exists());

    offline(&ws, OfflineRequest::default());
    write(temp.path(), "f1", "xy");
    commit(&ws, "unsynced");
    assert!(WorkspaceCommandService::online(&ws, false).is_err());
    WorkspaceCommandService::online(&ws, true).unwrap();
    assert_eq!(read(temp.path(), "f1"), "xy");
}

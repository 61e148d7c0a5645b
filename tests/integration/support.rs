use sos::config::SosConfig;
use sos::workspace::{OfflineRequest, Workspace, WorkspaceCommandService};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Workspace with built-in defaults only, so user configuration cannot leak into tests.
pub fn workspace(temp: &TempDir) -> Workspace {
    Workspace::new(temp.path(), SosConfig::default()).unwrap()
}

pub fn write(root: &Path, key: &str, content: impl AsRef<[u8]>) {
    let path = root.join(key);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn read(root: &Path, key: &str) -> String {
    fs::read_to_string(root.join(key)).unwrap()
}

pub fn offline(ws: &Workspace, request: OfflineRequest) {
    WorkspaceCommandService::offline(
        ws,
        &OfflineRequest {
            name: request.name.or_else(|| Some("trunk".to_string())),
            ..request
        },
    )
    .unwrap();
}

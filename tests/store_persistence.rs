#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Persistence behaviour of app storage driven through the public runtime
//! surface: documents survive process restarts (modelled as fresh runtime
//! instances over the same directory), corruption self-heals, and hostile
//! identities stay inside the apps root.

use std::path::Path;
use std::sync::Arc;
use wisp::config::{HostConfig, StorageConfig};
use wisp::notify::RecordingNotifier;
use wisp::platform::stub::StubSuspendBlocker;
use wisp::reminders::ManualScheduler;
use wisp::{AppId, HostRuntime};

fn runtime_at(dir: &Path) -> HostRuntime {
    let config = HostConfig {
        storage: StorageConfig {
            data_dir: Some(dir.to_path_buf()),
        },
        ..HostConfig::default()
    };
    HostRuntime::new(
        config,
        Arc::new(ManualScheduler::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(StubSuspendBlocker::new()),
    )
}

#[test]
fn documents_survive_runtime_restarts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let runtime = runtime_at(dir.path());
        let bridge = runtime.open_bridge(AppId::new("app_1"));
        bridge.save_data("tasks", "[\"buy milk\"]");
        bridge.save_data("theme", "dark");
    }

    let runtime = runtime_at(dir.path());
    let bridge = runtime.open_bridge(AppId::new("app_1"));
    assert_eq!(bridge.load_data("tasks"), "[\"buy milk\"]");
    assert_eq!(bridge.load_data("theme"), "dark");
}

#[test]
fn apps_stay_isolated_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let runtime = runtime_at(dir.path());
        runtime
            .open_bridge(AppId::new("app_1"))
            .save_data("k", "app one's value");
        runtime
            .open_bridge(AppId::new("app_2"))
            .save_data("k", "app two's value");
    }

    let runtime = runtime_at(dir.path());
    assert_eq!(
        runtime.open_bridge(AppId::new("app_1")).load_data("k"),
        "app one's value"
    );
    assert_eq!(
        runtime.open_bridge(AppId::new("app_2")).load_data("k"),
        "app two's value"
    );
    assert_eq!(runtime.open_bridge(AppId::new("app_3")).load_data("k"), "");
}

#[test]
fn corrupt_document_reads_empty_then_heals() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_at(dir.path());

    let bridge = runtime.open_bridge(AppId::new("app_1"));
    bridge.save_data("k", "v");

    let data_file = runtime.apps_root().join("app_1").join("data.json");
    std::fs::write(&data_file, "truncated garbag").unwrap();

    assert_eq!(bridge.load_data("k"), "");
    assert_eq!(bridge.get_all_data(), "{}");

    // Writing again replaces the corrupt file with a valid document.
    bridge.save_data("fresh", "start");
    assert_eq!(bridge.load_data("fresh"), "start");
    let reparsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&data_file).unwrap()).unwrap();
    assert!(reparsed.is_object());
}

#[test]
fn hostile_identity_cannot_escape_the_apps_root() {
    let dir = tempfile::tempdir().unwrap();
    // Nest the data root so a traversal would still land inside the
    // temp directory where we can see it.
    let data_root = dir.path().join("nested").join("deep");
    let runtime = runtime_at(&data_root);

    let bridge = runtime.open_bridge(AppId::new("../../escape"));
    bridge.save_data("k", "contained");
    assert_eq!(bridge.load_data("k"), "contained");

    // Everything written must live under the apps root.
    let apps_root = runtime.apps_root();
    assert!(apps_root.exists());
    assert!(!dir.path().join("nested").join("escape").exists());
    assert!(!dir.path().join("escape").exists());
    for entry in std::fs::read_dir(apps_root).unwrap() {
        let name = entry.unwrap().file_name();
        let name = name.to_string_lossy().into_owned();
        assert!(!name.contains("..") && !name.contains('/'), "suspicious app dir: {name}");
    }
}

#[test]
fn delete_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let runtime = runtime_at(dir.path());
        let bridge = runtime.open_bridge(AppId::new("app_1"));
        bridge.save_data("keep", "1");
        bridge.save_data("drop", "2");
        bridge.delete_data("drop");
    }

    let runtime = runtime_at(dir.path());
    let bridge = runtime.open_bridge(AppId::new("app_1"));
    assert_eq!(bridge.load_data("keep"), "1");
    assert_eq!(bridge.load_data("drop"), "");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::client::DaemonClient;
use crate::protocol::{Request, Response};
use crate::server::handle_connection;
use serde_json::json;

fn config(dir: &std::path::Path) -> (DaemonConfig, Paths) {
    let mut config = DaemonConfig {
        state_dir: Some(dir.join("state")),
        ..DaemonConfig::default()
    };
    config.engine.require_enrollment = false;
    config.engine.download_dir = dir.join("downloads");
    let paths = config.paths().unwrap();
    (config, paths)
}

#[tokio::test]
async fn startup_creates_state_and_shutdown_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let (config, paths) = config(dir.path());

    let mut daemon = startup(&config, &paths).await.unwrap();
    assert!(paths.socket_path.exists());
    assert!(paths.wal_path.exists());
    assert_eq!(
        std::fs::read_to_string(&paths.version_path).unwrap(),
        env!("CARGO_PKG_VERSION")
    );

    daemon.shutdown().await.unwrap();
    assert!(daemon.engine_stopped);
    assert!(!paths.socket_path.exists());
    assert!(!paths.lock_path.exists());
    assert!(!paths.version_path.exists());
}

#[tokio::test]
async fn second_daemon_cannot_take_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let (config, paths) = config(dir.path());

    let mut daemon = startup(&config, &paths).await.unwrap();
    let err = startup(&config, &paths).await.err().unwrap();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert!(paths.socket_path.exists());
    assert_eq!(
        std::fs::read_to_string(&paths.lock_path).unwrap().trim(),
        std::process::id().to_string()
    );

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn serves_requests_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let (config, paths) = config(dir.path());
    let mut daemon = startup(&config, &paths).await.unwrap();

    let socket = paths.socket_path.clone();
    let client = tokio::spawn(async move {
        DaemonClient::connect(&socket)
            .unwrap()
            .send(Request::Submit {
                payload: json!({ "cmd": "sync" }),
            })
            .await
    });
    let (stream, _) = daemon.listener.accept().await.unwrap();
    handle_connection(&mut daemon, stream).await.unwrap();
    assert_eq!(client.await.unwrap().unwrap(), Response::Accepted);

    let socket = paths.socket_path.clone();
    let client = tokio::spawn(async move {
        DaemonClient::connect(&socket)
            .unwrap()
            .send(Request::Shutdown)
            .await
    });
    let (stream, _) = daemon.listener.accept().await.unwrap();
    handle_connection(&mut daemon, stream).await.unwrap();
    assert_eq!(client.await.unwrap().unwrap(), Response::ShuttingDown);
    assert!(daemon.shutdown_requested);

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn apps_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (config, paths) = config(dir.path());

    std::fs::create_dir_all(paths.wal_path.parent().unwrap()).unwrap();
    {
        let store = WalAppStore::open(&paths.wal_path).unwrap();
        store
            .insert(&dm_core::App::new("com.example.foo", dm_core::Category::Managed))
            .await
            .unwrap();
    }

    let mut daemon = startup(&config, &paths).await.unwrap();
    let apps = daemon.engine.apps().await.unwrap();
    assert_eq!(apps.len(), 1);
    daemon.shutdown().await.unwrap();
}

#[test]
fn client_requires_a_socket() {
    let dir = tempfile::tempdir().unwrap();
    let err = DaemonClient::connect(&dir.path().join("missing.sock"))
        .err()
        .unwrap();
    assert!(matches!(err, crate::client::ClientError::DaemonNotRunning));
}

#[tokio::test]
async fn dry_run_install_is_tracked() {
    let dir = tempfile::tempdir().unwrap();
    let (mut config, paths) = config(dir.path());
    config.installer.dry_run = true;
    let package = dir.path().join("foo.pkg");
    std::fs::write(&package, b"package-bytes").unwrap();

    let mut daemon = startup(&config, &paths).await.unwrap();
    daemon
        .engine
        .submit(json!({
            "cmd": "install_app",
            "id": "act-1",
            "package": "com.example.foo",
            "source": { "type": "local_file", "path": package },
        }))
        .unwrap();

    let installed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let apps = daemon.engine.apps().await.unwrap();
            if apps.iter().any(|a| a.lifecycle.is_done()) {
                return apps;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(installed[0].package, "com.example.foo");
    assert!(installed[0].lifecycle.is_installed());

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn interrupted_uninstall_is_settled_and_can_be_resent() {
    let dir = tempfile::tempdir().unwrap();
    let (mut config, paths) = config(dir.path());
    config.installer.dry_run = true;

    std::fs::create_dir_all(paths.wal_path.parent().unwrap()).unwrap();
    {
        let store = WalAppStore::open(&paths.wal_path).unwrap();
        let mut app = dm_core::App::new("com.example.foo", dm_core::Category::Managed);
        let id = store.insert(&app).await.unwrap();
        app.id = Some(id);
        app.uninstall_received(&SystemClock);
        store.update(&app).await.unwrap();
    }

    let mut daemon = startup(&config, &paths).await.unwrap();
    let apps = daemon.engine.apps().await.unwrap();
    assert_eq!(apps.len(), 1);
    assert!(!apps[0].lifecycle.is_in_progress());
    assert!(apps[0].lifecycle.has_error());
    assert_eq!(apps[0].reason.as_deref(), Some(INTERRUPTED_REASON));

    daemon
        .engine
        .submit(json!({ "cmd": "uninstall_app", "id": "act-2", "package": "com.example.foo" }))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !daemon.engine.apps().await.unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    daemon.shutdown().await.unwrap();
}

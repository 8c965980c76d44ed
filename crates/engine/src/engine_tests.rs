// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{install, settle, test_config};
use dm_adapters::{FakeAppStore, FakeInstallAdapter, FakeServerAdapter, ServerCall};
use dm_core::{FakeClock, Step};
use serde_json::json;
use tempfile::TempDir;

type TestEngine = Engine<FakeAppStore, FakeServerAdapter, FakeInstallAdapter, FakeClock>;

struct Fixture {
    engine: TestEngine,
    store: FakeAppStore,
    server: FakeServerAdapter,
    installer: FakeInstallAdapter,
    dir: TempDir,
}

fn fixture(require_enrollment: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        require_enrollment,
        ..test_config(dir.path())
    };
    let store = FakeAppStore::new();
    let server = FakeServerAdapter::new();
    let installer = FakeInstallAdapter::new();
    let deps = EngineDeps {
        store: store.clone(),
        server: server.clone(),
        installer: installer.clone(),
    };
    Fixture {
        engine: Engine::new(deps, FakeClock::new(), config),
        store,
        server,
        installer,
        dir,
    }
}

#[test]
fn submit_rejects_malformed_payloads() {
    let f = fixture(false);
    assert!(matches!(
        f.engine.submit(json!({ "package": "x" })),
        Err(PayloadError::MissingCmd)
    ));
    assert!(f.engine.submit(json!({ "cmd": "reboot" })).is_err());
    assert_eq!(f.engine.status().immediate, 0);
}

#[test]
fn status_reflects_queued_work() {
    let f = fixture(true);
    f.engine.submit(json!({ "cmd": "sync" })).unwrap();
    f.engine.submit(json!({ "cmd": "enroll" })).unwrap();

    let status = f.engine.status();
    assert_eq!(
        status,
        EngineStatus {
            ready: false,
            immediate: 2,
            deferred: 0,
            in_flight: 2,
            background: None,
            pending_results: 0,
        }
    );
}

#[test]
fn status_serializes_handler_state_in_snake_case() {
    let status = EngineStatus {
        ready: true,
        immediate: 0,
        deferred: 0,
        in_flight: 1,
        background: Some(HandlerState::Waiting),
        pending_results: 0,
    };
    let value = serde_json::to_value(&status).unwrap();
    assert_eq!(value["background"], "waiting");
}

#[tokio::test]
async fn run_enrolls_then_installs() {
    let f = fixture(true);
    let handle = f.engine.start();

    settle(|| f.engine.status().ready).await;
    let local = json!({ "type": "local_file", "path": f.dir.path().join("a.pkg") });
    f.engine
        .submit(install("act-1", "com.example.a", local))
        .unwrap();

    settle(|| f.installer.pending() == 1).await;
    let reference = f.installer.last_reference().unwrap();
    assert!(f.engine.wake(reference, CompletionCode::Success));

    settle(|| {
        f.store
            .app("com.example.a")
            .and_then(|a| a.lifecycle.step())
            == Some(Step::Done(dm_core::Outcome::Completed))
    })
    .await;

    f.engine.shutdown();
    handle.await.unwrap().unwrap();

    assert!(f
        .server
        .calls()
        .iter()
        .any(|c| matches!(c, ServerCall::Enroll { .. })));
    let apps = f.engine.apps().await.unwrap();
    assert_eq!(apps.len(), 1);
    assert!(f.engine.events().iter().any(|e| e.description == "install completed"));
}

#[tokio::test]
async fn second_run_is_refused() {
    let f = fixture(false);
    let handle = f.engine.start();
    settle(|| {
        f.server
            .calls()
            .contains(&ServerCall::LatestRelease)
    })
    .await;

    assert!(matches!(f.engine.run().await, Err(EngineError::AlreadyRunning)));

    f.engine.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_before_run_returns_immediately() {
    let f = fixture(false);
    f.engine.shutdown();
    f.engine.run().await.unwrap();
    assert!(f.server.calls().is_empty());
}

#[tokio::test]
async fn enrollment_failure_stops_the_engine() {
    let f = fixture(true);
    f.server.fail_enroll(u32::MAX);
    let engine = Engine::new(
        EngineDeps {
            store: f.store.clone(),
            server: f.server.clone(),
            installer: f.installer.clone(),
        },
        FakeClock::new(),
        EngineConfig {
            enroll_max_attempts: 1,
            require_enrollment: true,
            ..test_config(f.dir.path())
        },
    );

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, EngineError::Aborted(_)));
}

#[test]
fn wake_without_waiter_is_false() {
    let f = fixture(false);
    assert!(!f
        .engine
        .wake(ReferenceId::from("nobody"), CompletionCode::Success));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dm_adapters::{FakeAppStore, FakeInstallAdapter, FakeServerAdapter};
use dm_core::{App, Category, CompletionCode, FakeClock, ReferenceId};
use dm_engine::{EngineConfig, EngineDeps};
use serde_json::json;

type TestEngine = Engine<FakeAppStore, FakeServerAdapter, FakeInstallAdapter, FakeClock>;

fn engine(store: FakeAppStore) -> TestEngine {
    Engine::new(
        EngineDeps {
            store,
            server: FakeServerAdapter::new(),
            installer: FakeInstallAdapter::new(),
        },
        FakeClock::new(),
        EngineConfig {
            require_enrollment: false,
            ..EngineConfig::default()
        },
    )
}

async fn request(engine: &TestEngine, request: Request) -> Response {
    handle_request(engine, Duration::from_secs(42), request).await
}

#[tokio::test]
async fn ping_and_hello() {
    let engine = engine(FakeAppStore::new());
    assert_eq!(request(&engine, Request::Ping).await, Response::Pong);
    assert_eq!(
        request(
            &engine,
            Request::Hello {
                version: "0.0.1".to_string()
            }
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn submit_queues_valid_payloads() {
    let engine = engine(FakeAppStore::new());
    let response = request(
        &engine,
        Request::Submit {
            payload: json!({ "cmd": "sync" }),
        },
    )
    .await;
    assert_eq!(response, Response::Accepted);

    let Response::Status {
        uptime_secs,
        engine: status,
    } = request(&engine, Request::Status).await
    else {
        panic!("expected status");
    };
    assert_eq!(uptime_secs, 42);
    assert_eq!(status.immediate, 1);
    assert!(status.ready);
}

#[tokio::test]
async fn submit_reports_invalid_payloads() {
    let engine = engine(FakeAppStore::new());
    let response = request(
        &engine,
        Request::Submit {
            payload: json!({ "cmd": "format_disk" }),
        },
    )
    .await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn completion_without_waiter_is_an_error() {
    let engine = engine(FakeAppStore::new());
    let response = request(
        &engine,
        Request::Complete {
            reference: ReferenceId::from("ref-1"),
            code: CompletionCode::Success,
        },
    )
    .await;
    let Response::Error { message } = response else {
        panic!("expected error");
    };
    assert!(message.contains("ref-1"));
}

#[tokio::test]
async fn list_apps_reads_the_store() {
    let store = FakeAppStore::new();
    store
        .insert(&App::new("com.example.foo", Category::Managed))
        .await
        .unwrap();
    let engine = engine(store);

    let Response::Apps { apps } = request(&engine, Request::ListApps).await else {
        panic!("expected apps");
    };
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].package, "com.example.foo");
}

#[tokio::test]
async fn events_start_empty() {
    let engine = engine(FakeAppStore::new());
    assert_eq!(
        request(&engine, Request::ListEvents).await,
        Response::Events { events: vec![] }
    );
}

#[tokio::test]
async fn shutdown_is_acknowledged() {
    let engine = engine(FakeAppStore::new());
    assert_eq!(
        request(&engine, Request::Shutdown).await,
        Response::ShuttingDown
    );
}

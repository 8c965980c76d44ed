// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dm_core::Source;

fn request(reference: &str) -> InstallRequest {
    InstallRequest {
        reference: ReferenceId::from(reference),
        package: "com.example.foo".to_string(),
        source: Source::Store {
            id: "foo".to_string(),
        },
        version: None,
        file: None,
    }
}

#[tokio::test]
async fn started_actions_complete_through_their_sink() {
    let installer = FakeInstallAdapter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let sink = CompletionSink::new(move |reference, code| {
        recorder.lock().unwrap().push((reference, code));
    });

    let triggered = installer.install(&request("ref-1"), sink).await.unwrap();
    assert_eq!(triggered, Triggered::Started);
    assert_eq!(installer.pending(), 1);

    assert!(installer.complete(&ReferenceId::from("ref-1"), CompletionCode::Success));
    assert!(!installer.complete(&ReferenceId::from("ref-1"), CompletionCode::Success));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn busy_then_immediate() {
    let installer = FakeInstallAdapter::new();
    installer.set_busy(1);
    installer.set_immediate(Some(CompletionCode::Cancelled));

    let first = installer
        .install(&request("ref-1"), CompletionSink::discard())
        .await;
    assert!(matches!(first, Err(InstallError::Busy)));

    let second = installer
        .install(&request("ref-2"), CompletionSink::discard())
        .await
        .unwrap();
    assert_eq!(second, Triggered::Finished(CompletionCode::Cancelled));
    assert_eq!(installer.calls().len(), 2);
    assert_eq!(installer.last_reference(), Some(ReferenceId::from("ref-2")));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dm_adapters::{FakeServerAdapter, ServerCall};
use dm_core::CommandResult;

fn entry(id: &str) -> ResultEntry {
    let mut result = CommandResult::new();
    result.succeed();
    ResultEntry::for_command(id, &result)
}

#[tokio::test]
async fn empty_flush_does_not_call_server() {
    let server = FakeServerAdapter::new();
    let reporter = Reporter::new();
    assert!(reporter.flush(&server, "d-1").await);
    assert!(server.calls().is_empty());
}

#[tokio::test]
async fn failed_batch_is_retried_in_order() {
    let server = FakeServerAdapter::new();
    server.fail_submit(1);
    let reporter = Reporter::new();
    reporter.record(entry("c-1"));
    reporter.record(entry("c-2"));

    assert!(!reporter.flush(&server, "d-1").await);
    assert_eq!(reporter.pending(), 2);

    reporter.record(entry("c-3"));
    assert!(reporter.flush(&server, "d-1").await);
    assert_eq!(reporter.pending(), 0);

    let keys: Vec<String> = server
        .submitted()
        .iter()
        .filter_map(|e| e.key().map(str::to_string))
        .collect();
    assert_eq!(keys, vec!["c-1", "c-2", "c-3"]);
    assert_eq!(
        server.calls().last(),
        Some(&ServerCall::SubmitResults {
            device_id: "d-1".to_string(),
            count: 3
        })
    );
}

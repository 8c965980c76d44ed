// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn new_result_is_failed_without_error() {
    let result = CommandResult::new();
    assert_eq!(result.signal(), Signal::Failed);
    assert!(result.error().is_none());
}

#[test]
fn success_clears_error() {
    let mut result = CommandResult::new();
    result.fail_with_code("boom", 2);
    result.succeed();
    assert_eq!(result.signal(), Signal::Success);
    assert!(result.error().is_none());
    assert!(result.code().is_none());
}

#[test]
fn abort_outranks_everything() {
    let mut result = CommandResult::new();
    result.mark_pending();
    result.abort("enrollment rejected");
    assert_eq!(result.signal(), Signal::Abort);
    assert_eq!(result.error(), Some("enrollment rejected"));
    assert!(!result.is_success());
}

#[test]
fn pending_outranks_success() {
    let mut result = CommandResult::new();
    result.mark_pending();
    assert_eq!(result.signal(), Signal::Pending);
    assert_eq!(ResultStatus::from(result.signal()), ResultStatus::Pending);
}

#[test]
fn entry_wire_shape() {
    let mut result = CommandResult::new();
    result.fail("download failed");
    let entry = ResultEntry::for_activity("act-1", &result);

    assert_eq!(
        serde_json::to_value(&entry).unwrap(),
        json!({ "activity_id": "act-1", "success": "failed", "error": "download failed" })
    );
    assert_eq!(entry.key(), Some("act-1"));
}

#[test]
fn successful_entry_omits_error() {
    let mut result = CommandResult::new();
    result.succeed();
    let entry = ResultEntry::for_command("cmd-1", &result);

    assert_eq!(
        serde_json::to_value(&entry).unwrap(),
        json!({ "command_id": "cmd-1", "success": "success" })
    );
}

#[test]
fn abort_reports_as_failed() {
    let mut result = CommandResult::new();
    result.abort("fatal");
    let entry = ResultEntry::for_command("cmd-2", &result);
    assert_eq!(entry.success, ResultStatus::Failed);
}

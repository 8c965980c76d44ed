// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn parses_install_app() {
    let payload = CommandPayload::parse(&json!({
        "cmd": "install_app",
        "id": "act-1",
        "package": "com.example.foo",
        "source": { "type": "remote_file", "url": "https://cdn/foo.pkg" },
        "version": { "code": 3, "name": "1.2.0" }
    }))
    .unwrap();

    match &payload {
        CommandPayload::InstallApp {
            package,
            source,
            version,
            ..
        } => {
            assert_eq!(package, "com.example.foo");
            assert!(source.is_remote_file());
            assert_eq!(version.as_ref().map(|v| v.code), Some(3));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert_eq!(payload.id(), Some("act-1"));
    assert_eq!(payload.name(), "install_app");
}

#[test]
fn parses_commands_without_fields() {
    let enroll = CommandPayload::parse(&json!({ "cmd": "enroll" })).unwrap();
    assert_eq!(enroll, CommandPayload::Enroll { id: None });

    let sync = CommandPayload::parse(&json!({ "cmd": "sync", "id": "c-9" })).unwrap();
    assert_eq!(sync.id(), Some("c-9"));
}

#[test]
fn missing_cmd_is_rejected() {
    let err = CommandPayload::parse(&json!({ "package": "x" })).unwrap_err();
    assert!(matches!(err, PayloadError::MissingCmd));
}

#[test]
fn unknown_cmd_is_invalid() {
    let err = CommandPayload::parse(&json!({ "cmd": "reboot" })).unwrap_err();
    assert!(matches!(err, PayloadError::Invalid(_)));
}

#[test]
fn raw_id_survives_bad_payloads() {
    let value = json!({ "cmd": "install_app", "id": "act-7" });
    assert!(CommandPayload::parse(&value).is_err());
    assert_eq!(CommandPayload::raw_id(&value).as_deref(), Some("act-7"));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dm_core::{App, AppId, Category};

fn app(id: u64, package: &str) -> App {
    let mut app = App::new(package, Category::Managed);
    app.id = Some(AppId(id));
    app
}

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    // Write operations
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&Operation::AppInsert {
            app: app(1, "com.example.foo"),
        })
        .unwrap();
        wal.append(&Operation::AppDelete { id: AppId(1) }).unwrap();
    }

    // Read back
    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], Operation::AppInsert { .. }));
    assert!(matches!(ops[1], Operation::AppDelete { id: AppId(1) }));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    // First session
    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        wal.append(&Operation::AppDelete { id: AppId(3) }).unwrap();
        assert_eq!(wal.sequence(), 1);
    }

    // Second session - sequence should continue
    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        assert_eq!(wal.append(&Operation::AppDelete { id: AppId(4) }).unwrap(), 2);
    }
}

#[test]
fn replay_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ops = Wal::replay(&dir.path().join("absent.wal")).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn torn_final_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&Operation::AppDelete { id: AppId(1) }).unwrap();
    }
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str(r#"{"seq":2,"op":{"AppDel"#);
    std::fs::write(&path, contents).unwrap();

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(Wal::open(&path).unwrap().sequence(), 1);
}

#[test]
fn corruption_before_the_tail_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    std::fs::write(
        &path,
        "not json\n{\"seq\":2,\"op\":{\"AppDelete\":{\"id\":1}}}\n",
    )
    .unwrap();

    let err = Wal::replay(&path).unwrap_err();
    assert!(matches!(err, WalError::Corrupt { line: 1, .. }), "{}", err);
}

#[test]
fn append_after_torn_tail_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    std::fs::write(
        &path,
        "{\"seq\":1,\"op\":{\"AppDelete\":{\"id\":1}}}\n{\"seq\":2,\"op\":{\"App",
    )
    .unwrap();

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.append(&Operation::AppDelete { id: AppId(5) }).unwrap(), 2);
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[1], Operation::AppDelete { id: AppId(5) }));
}

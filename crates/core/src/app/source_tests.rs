// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn store(id: &str) -> Source {
    Source::Store { id: id.to_string() }
}

fn remote(url: &str) -> Source {
    Source::RemoteFile {
        url: url.to_string(),
        sha256: None,
    }
}

#[test]
fn same_type_and_descriptor_are_equal() {
    assert!(source_equals(Some(&store("foo")), Some(&store("foo"))));
    assert!(!source_equals(Some(&store("foo")), Some(&store("bar"))));
}

#[test]
fn same_descriptor_different_type_differs() {
    let local = Source::LocalFile {
        path: PathBuf::from("https://example.com/foo.pkg"),
    };
    assert!(!source_equals(
        Some(&local),
        Some(&remote("https://example.com/foo.pkg"))
    ));
}

#[test]
fn checksum_does_not_affect_source_equality() {
    let with_sum = Source::RemoteFile {
        url: "https://example.com/a.pkg".to_string(),
        sha256: Some("abc".to_string()),
    };
    assert!(source_equals(
        Some(&with_sum),
        Some(&remote("https://example.com/a.pkg"))
    ));
}

#[parameterized(
    both_null = { false, false, true },
    left_null = { false, true, false },
    right_null = { true, false, false },
    both_set = { true, true, true },
)]
fn source_null_rules(left: bool, right: bool, expected: bool) {
    let s = store("foo");
    let a = left.then_some(&s);
    let b = right.then_some(&s);
    assert_eq!(source_equals(a, b), expected);
}

#[parameterized(
    both_null = { false, false, false },
    left_null = { false, true, true },
    right_null = { true, false, true },
    both_set = { true, true, false },
)]
fn version_null_rules(left: bool, right: bool, expected: bool) {
    let v = Version::new(3).with_name("1.2.0");
    let a = left.then_some(&v);
    let b = right.then_some(&v);
    assert_eq!(version_differs(a, b), expected);
}

#[test]
fn version_code_difference_means_update() {
    assert!(version_differs(
        Some(&Version::new(1)),
        Some(&Version::new(2))
    ));
}

#[test]
fn equal_codes_fall_back_to_code_string_and_name() {
    let a = Version::new(5).with_name("1.0");
    let b = Version::new(5).with_name("1.0.1");
    assert!(version_differs(Some(&a), Some(&b)));

    let a = Version::new(5).with_code_string("5a");
    let b = Version::new(5);
    assert!(version_differs(Some(&a), Some(&b)));

    let a = Version::new(5).with_code_string("5a").with_name("1.0");
    let b = Version::new(5).with_code_string("5a").with_name("1.0");
    assert!(!version_differs(Some(&a), Some(&b)));
}

#[test]
fn source_serializes_with_type_tag() {
    let json = serde_json::to_value(store("com.example.foo")).unwrap();
    assert_eq!(json["type"], "store");
    assert_eq!(json["id"], "com.example.foo");

    let parsed: Source =
        serde_json::from_str(r#"{"type":"remote_file","url":"https://x/y.pkg"}"#).unwrap();
    assert_eq!(parsed, remote("https://x/y.pkg"));
}

//! Smoke tests for the `dbal` binary

use assert_cmd::Command;

fn dbal() -> Command {
    Command::cargo_bin("dbal").unwrap()
}

#[test]
fn test_prints_rows_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");
    let db = db.to_string_lossy();

    dbal()
        .args([db.as_ref(), "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, ok BOOLEAN)"])
        .assert()
        .success();
    dbal()
        .args([db.as_ref(), "INSERT INTO t (name, ok) VALUES ('a', 1), ('b', 0)"])
        .assert()
        .success();

    let output = dbal()
        .args([db.as_ref(), "SELECT * FROM t ORDER BY id"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"id":1,"name":"a","ok":true}"#,
            r#"{"id":2,"name":"b","ok":false}"#,
            "0 row(s) affected",
        ]
    );
}

#[test]
fn test_reports_classified_errors() {
    let output = dbal().args([":memory:", "SELECT * FROM missing"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no such table"), "stderr: {}", stderr);
}

#[test]
fn test_usage_without_arguments() {
    dbal().assert().code(2);
}

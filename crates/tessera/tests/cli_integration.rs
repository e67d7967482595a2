//! CLI integration tests for the Tessera command-line interface.
//!
//! Each test points the binary at a fresh SQLite file in a temp dir and
//! checks command output.

use std::path::Path;

use assert_cmd::Command;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use tempfile::TempDir;
use tessera_session::{
    AttributeCodec, Attributes, JsonCodec, SessionRecord, SqliteRepository, Value,
};

/// Get a command for the tessera binary bound to `db`.
fn tessera(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tessera").unwrap();
    cmd.env_remove("TESSERA_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db);
    cmd
}

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.db");
    (dir, path)
}

/// Write records straight into `db`. Ages are seconds before now; the
/// default lifetime is one day.
fn seed(db: &Path, records: &[(&str, i64)]) {
    let repo = SqliteRepository::open(db).unwrap();
    let mut attrs = Attributes::new();
    attrs.insert("uid".to_string(), Value::Int(42));
    let blob = JsonCodec.encode(&attrs).unwrap();

    for (id, age) in records {
        let record =
            SessionRecord::new(*id, Utc::now() - Duration::seconds(*age)).with_data(blob.clone());
        repo.insert_record(&record).unwrap();
    }
}

const DAY: i64 = 86_400;

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("tessera")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("regenerate"))
        .stdout(predicate::str::contains("gc"))
        .stdout(predicate::str::contains("sweep"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("tessera")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tessera"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Database Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_count_empty_database() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .arg("count")
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));
}

#[test]
fn test_count_json() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["--json", "count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sessions\": 0"));
}

#[test]
fn test_exists_missing() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["exists", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn test_show_missing_fails() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_destroy_strict_missing_fails() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["destroy", "--strict", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_regenerate_missing_fails() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["regenerate", "old", "new"])
        .assert()
        .failure();
}

#[test]
fn test_gc_reports_removed() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["--json", "gc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 0"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Seeded Database Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_show_fresh_session() {
    let (_dir, db) = temp_db();
    seed(&db, &[("live", 10)]);

    tessera(&db)
        .args(["show", "live"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fresh"))
        .stdout(predicate::str::contains("uid"))
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_show_stale_session_json() {
    let (_dir, db) = temp_db();
    seed(&db, &[("stale", 2 * DAY)]);

    tessera(&db)
        .args(["--json", "show", "stale"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expired\": true"))
        .stdout(predicate::str::contains("\"attributes\": {}"));
}

#[test]
fn test_destroy_decrements_count() {
    let (_dir, db) = temp_db();
    seed(&db, &[("a", 10), ("b", 10)]);

    tessera(&db)
        .args(["destroy", "--strict", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Destroyed"));
    tessera(&db)
        .arg("count")
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_regenerate_moves_session() {
    let (_dir, db) = temp_db();
    seed(&db, &[("old", 10)]);

    tessera(&db)
        .args(["regenerate", "old", "new"])
        .assert()
        .success();
    tessera(&db)
        .args(["exists", "old"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
    tessera(&db)
        .args(["exists", "new"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));
}

#[test]
fn test_gc_removes_stale_session() {
    let (_dir, db) = temp_db();
    seed(&db, &[("stale", 2 * DAY), ("live", 10)]);

    tessera(&db)
        .args(["--json", "gc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 1"))
        .stdout(predicate::str::contains("\"after\": 1"));
    tessera(&db)
        .args(["exists", "live"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));
}

#[test]
fn test_zero_lifetime_rejected() {
    let (_dir, db) = temp_db();
    tessera(&db)
        .args(["--max-lifetime", "0", "count"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_lifetime"));
}

#[test]
fn test_config_file_is_used() {
    let (dir, db) = temp_db();
    let config = dir.path().join("tessera.toml");
    std::fs::write(
        &config,
        format!("[session]\nmax_lifetime = 60\nconnection = {:?}\n", db.display().to_string()),
    )
    .unwrap();

    Command::cargo_bin("tessera")
        .unwrap()
        .env_remove("TESSERA_DB")
        .arg("--config")
        .arg(&config)
        .arg("count")
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));
    assert!(db.exists());
}

#[test]
fn test_unknown_provider_rejected() {
    let (dir, db) = temp_db();
    let config = dir.path().join("tessera.toml");
    std::fs::write(&config, "[session]\nprovider = \"redis\"\n").unwrap();

    tessera(&db)
        .arg("--config")
        .arg(&config)
        .arg("count")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown provider"));
}

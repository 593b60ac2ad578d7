//! Integration tests for polyarc-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

fn polyarc_cmd() -> Command {
    cargo_bin_cmd!("polyarc")
}

/// Writes `site/index.html`, `site/assets/app.js` and `notes.txt` under `root`.
fn write_sources(root: &Path) {
    fs::create_dir_all(root.join("site/assets")).unwrap();
    fs::write(root.join("site/index.html"), "<h1>hi</h1>").unwrap();
    fs::write(root.join("site/assets/app.js"), "console.log(1)").unwrap();
    fs::write(root.join("notes.txt"), "remember the milk").unwrap();
}

/// Creates `name` in `temp` from the standard sources.
fn create_archive(temp: &TempDir, name: &str) -> PathBuf {
    write_sources(temp.path());
    let archive = temp.path().join(name);
    polyarc_cmd()
        .current_dir(temp.path())
        .arg("create")
        .arg(&archive)
        .arg("site")
        .arg("notes.txt")
        .assert()
        .success();
    archive
}

fn list_paths(archive: &Path) -> Vec<String> {
    let output = polyarc_cmd()
        .arg("list")
        .arg(archive)
        .arg("--json")
        .output()
        .expect("failed to run list");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["path"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_version_flag() {
    polyarc_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polyarc"));
}

#[test]
fn test_help_flag() {
    polyarc_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Command-line host"));
}

#[test]
fn test_subcommand_help() {
    polyarc_cmd()
        .args(["copy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SRC_ARCHIVE"))
        .stdout(predicate::str::contains("DST_ARCHIVE"));
}

#[test]
fn test_no_subcommand_fails() {
    polyarc_cmd().assert().failure();
}

#[test]
fn test_formats_lists_builtin_providers() {
    polyarc_cmd()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("zip"))
        .stdout(predicate::str::contains("7z"))
        .stdout(predicate::str::contains("compressor"));
}

#[test]
fn test_formats_json() {
    let output = polyarc_cmd().args(["formats", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "formats");
    let rows = json["data"].as_array().unwrap();
    let sevenz = rows.iter().find(|row| row["extension"] == "7z").unwrap();
    assert!(sevenz["reader"].is_string());
    assert!(sevenz["writer"].is_null());
}

#[test]
fn test_create_and_list_zip() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");
    assert!(archive.exists());

    polyarc_cmd()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("site/"))
        .stdout(predicate::str::contains("site/assets/app.js"))
        .stdout(predicate::str::contains("notes.txt"));
}

#[test]
fn test_list_long_shows_totals() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.tgz");

    polyarc_cmd()
        .args(["list", "--long", "-H"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:"))
        .stdout(predicate::str::contains("3 files"));
}

#[test]
fn test_list_json_structure() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");

    let output = polyarc_cmd()
        .arg("list")
        .arg(&archive)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "list");
    assert_eq!(json["status"], "success");
    let entries = json["data"]["entries"].as_array().unwrap();
    assert_eq!(json["data"]["total_entries"], entries.len());

    let app = entries
        .iter()
        .find(|entry| entry["path"] == "site/assets/app.js")
        .unwrap();
    assert_eq!(app["level"], 2);
    assert_eq!(app["is_folder"], false);
    assert_eq!(app["raw_size"], 14);
}

#[test]
fn test_test_command_passes_on_fresh_archive() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.tzst");

    polyarc_cmd()
        .arg("test")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Tested"));
}

#[test]
fn test_test_command_fails_on_garbage() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.zip");
    fs::write(&archive, b"this is not a zip archive").unwrap();

    polyarc_cmd()
        .arg("test")
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"))
        .stderr(predicate::str::contains("broken.zip"));
}

#[test]
fn test_extract_single_file() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");
    let out = temp.path().join("out.js");

    polyarc_cmd()
        .arg("extract")
        .arg(&archive)
        .arg("site/assets/app.js")
        .arg(&out)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "console.log(1)");
}

#[test]
fn test_extract_folder_defaults_to_current_dir() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.tar");
    let work = temp.path().join("work");
    fs::create_dir(&work).unwrap();

    polyarc_cmd()
        .current_dir(&work)
        .arg("extract")
        .arg(&archive)
        .arg("site/assets")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(work.join("assets/app.js")).unwrap(),
        "console.log(1)"
    );
    assert!(!work.join("index.html").exists());
}

#[test]
fn test_extract_missing_entry_hints_list() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");

    polyarc_cmd()
        .arg("extract")
        .arg(&archive)
        .arg("site/missing.css")
        .arg(temp.path().join("x"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("polyarc list"));
}

#[test]
fn test_add_with_prefix() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");
    fs::write(temp.path().join("extra.css"), "body {}").unwrap();

    polyarc_cmd()
        .arg("add")
        .arg(&archive)
        .arg(temp.path().join("extra.css"))
        .args(["--prefix", "site/assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    let paths = list_paths(&archive);
    assert!(paths.contains(&"site/assets/extra.css".to_string()));
    assert!(paths.contains(&"site/assets/app.js".to_string()));
    assert!(paths.contains(&"notes.txt".to_string()));
}

#[test]
fn test_add_requires_sources() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");

    polyarc_cmd().arg("add").arg(&archive).assert().failure();
}

#[test]
fn test_create_excludes_patterns() {
    let temp = TempDir::new().unwrap();
    write_sources(temp.path());
    fs::write(temp.path().join("site/debug.log"), "noise").unwrap();
    let archive = temp.path().join("site.zip");

    polyarc_cmd()
        .current_dir(temp.path())
        .arg("create")
        .arg(&archive)
        .arg("site")
        .args(["--exclude", "*.log"])
        .assert()
        .success();

    let paths = list_paths(&archive);
    assert!(paths.contains(&"site/index.html".to_string()));
    assert!(!paths.iter().any(|path| path.ends_with(".log")));
}

#[test]
fn test_rm_removes_folder_and_children() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");

    polyarc_cmd()
        .arg("rm")
        .arg(&archive)
        .arg("site/assets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    let paths = list_paths(&archive);
    assert!(!paths.iter().any(|path| path.starts_with("site/assets")));
    assert!(paths.contains(&"site/index.html".to_string()));
}

#[test]
fn test_rm_missing_entry_leaves_archive() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");
    let before = fs::read(&archive).unwrap();

    polyarc_cmd()
        .arg("rm")
        .arg(&archive)
        .arg("nope.txt")
        .assert()
        .failure();

    assert_eq!(fs::read(&archive).unwrap(), before);
}

#[test]
fn test_copy_into_new_archive() {
    let temp = TempDir::new().unwrap();
    let source = create_archive(&temp, "site.zip");
    let destination = temp.path().join("copy.tgz");

    polyarc_cmd()
        .arg("copy")
        .arg(&source)
        .arg("site/assets")
        .arg(&destination)
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied"));

    let copied = list_paths(&destination);
    assert!(copied.contains(&"site/assets/app.js".to_string()));
    assert!(list_paths(&source).contains(&"site/assets/app.js".to_string()));
}

#[test]
fn test_move_between_archives() {
    let temp = TempDir::new().unwrap();
    let source = create_archive(&temp, "site.zip");
    let destination = temp.path().join("other.zip");
    fs::write(temp.path().join("readme.md"), "# other").unwrap();
    polyarc_cmd()
        .arg("create")
        .arg(&destination)
        .arg(temp.path().join("readme.md"))
        .assert()
        .success();

    polyarc_cmd()
        .arg("move")
        .arg(&source)
        .arg("notes.txt")
        .arg(&destination)
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved"));

    let moved = list_paths(&destination);
    assert!(moved.contains(&"notes.txt".to_string()));
    assert!(moved.contains(&"readme.md".to_string()));
    assert!(!list_paths(&source).contains(&"notes.txt".to_string()));
}

#[test]
fn test_move_into_same_archive_is_refused() {
    let temp = TempDir::new().unwrap();
    let source = create_archive(&temp, "site.zip");

    polyarc_cmd()
        .arg("move")
        .arg(&source)
        .arg("notes.txt")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("same archive"));

    assert!(list_paths(&source).contains(&"notes.txt".to_string()));
}

#[test]
fn test_compressor_create_writes_gzip_magic() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("app.log"), "line\n".repeat(100)).unwrap();
    let archive = temp.path().join("app.log.gz");

    polyarc_cmd()
        .arg("create")
        .arg(&archive)
        .arg(temp.path().join("app.log"))
        .assert()
        .success();

    let bytes = fs::read(&archive).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_unsupported_format_hints_supported_ones() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("data.rar");
    fs::write(&archive, b"Rar!").unwrap();

    polyarc_cmd()
        .arg("list")
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("HINT"))
        .stderr(predicate::str::contains("zip"));
}

#[test]
fn test_sevenz_is_read_only() {
    let temp = TempDir::new().unwrap();
    write_sources(temp.path());
    let archive = temp.path().join("site.7z");

    polyarc_cmd()
        .arg("create")
        .arg(&archive)
        .arg(temp.path().join("notes.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("HINT"));

    assert!(!archive.exists());
}

#[test]
fn test_priority_flag_rejects_malformed_pair() {
    polyarc_cmd()
        .args(["formats", "--priority", "zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_priority_flag_accepts_override() {
    polyarc_cmd()
        .args(["formats", "--priority", "zip=5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zip"));
}

#[test]
fn test_encrypted_zip_round_trip() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("secret.txt"), "top secret").unwrap();
    let archive = temp.path().join("vault.zip");

    polyarc_cmd()
        .arg("create")
        .arg(&archive)
        .arg(temp.path().join("secret.txt"))
        .args(["--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());

    let out = temp.path().join("plain.txt");
    polyarc_cmd()
        .arg("extract")
        .arg(&archive)
        .arg("secret.txt")
        .arg(&out)
        .args(["--password", "hunter2"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&out).unwrap(), "top secret");
}

#[test]
fn test_quiet_suppresses_output() {
    let temp = TempDir::new().unwrap();
    let archive = create_archive(&temp, "site.zip");

    polyarc_cmd()
        .arg("list")
        .arg(&archive)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_error_json_output() {
    let temp = TempDir::new().unwrap();
    let output = polyarc_cmd()
        .arg("list")
        .arg(temp.path().join("missing.zip"))
        .arg("--json")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("missing.zip"));
}

#[test]
fn test_completion_bash() {
    polyarc_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("polyarc"));
}

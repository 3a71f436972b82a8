use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn codereel(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("codereel").unwrap();
    cmd.env("CODEREEL_DATA_DIR", data_dir).env("RUST_LOG", "off");
    cmd
}

fn write_project(dir: &Path, name: &str, snapshots: &str) -> PathBuf {
    let body = format!(
        r#"{{
  "metadata": {{
    "id": "p1",
    "name": "Demo",
    "version": "1.0.0",
    "createdAt": "2024-01-01T00:00:00.000Z",
    "updatedAt": "2024-01-01T00:00:00.000Z",
    "tags": []
  }},
  "document": {{
    "language": "javascript",
    "snapshots": {},
    "fontSize": 14,
    "lineHeight": 20,
    "width": 800,
    "height": 600,
    "theme": "default",
    "padding": {{"top": 16, "right": 16, "bottom": 16, "left": 16}}
  }}
}}"#,
        snapshots
    );
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn valid_project(dir: &Path) -> PathBuf {
    write_project(
        dir,
        "demo.json",
        r#"[{"id": "s1", "code": "const a = 1;", "duration": 1000, "transitionTime": 200}]"#,
    )
}

#[test]
fn test_without_command_prints_hint() {
    let data = TempDir::new().unwrap();
    codereel(data.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("codereel --help"));
}

#[test]
fn test_config_shows_paths() {
    let data = TempDir::new().unwrap();
    codereel(data.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("codereel Configuration"))
        .stdout(predicate::str::contains(data.path().to_string_lossy().as_ref()))
        .stdout(predicate::str::contains("JSON, YAML, CSV, XML, ZIP"));

    codereel(data.path())
        .args(["config", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings written to"));
    assert!(data.path().join("config.json").exists());
}

#[test]
fn test_validate_accepts_valid_file() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());

    codereel(data.path())
        .arg("validate")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.json is valid."));
}

#[test]
fn test_validate_rejects_duplicate_snapshot_ids() {
    let data = TempDir::new().unwrap();
    let input = write_project(
        data.path(),
        "dup.json",
        r#"[{"id": "a", "code": "x", "duration": 1000}, {"id": "a", "code": "y", "duration": 1000}]"#,
    );

    codereel(data.path())
        .arg("validate")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Duplicate snapshot ID"));
}

#[test]
fn test_import_missing_file_fails() {
    let data = TempDir::new().unwrap();
    codereel(data.path())
        .args(["import", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_import_then_export() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());

    codereel(data.path())
        .arg("import")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:    Success"));

    let output = data.path().join("out.yaml");
    codereel(data.path())
        .arg("export")
        .arg(&output)
        .args(["--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Export complete!"));

    let exported = fs::read_to_string(&output).unwrap();
    assert!(exported.contains("const a = 1;"));
    assert!(exported.contains("Demo"));
}

#[test]
fn test_export_without_project_fails() {
    let data = TempDir::new().unwrap();
    codereel(data.path())
        .arg("export")
        .assert()
        .failure()
        .stdout(predicate::str::contains("no project data to export"));
}

#[test]
fn test_preview_does_not_commit() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());

    codereel(data.path())
        .arg("preview")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshots: 1"));

    codereel(data.path())
        .arg("export")
        .assert()
        .failure();
}

#[test]
fn test_history_lists_imports() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());

    codereel(data.path())
        .args(["history", "imports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports recorded."));

    codereel(data.path()).arg("import").arg(&input).assert().success();

    codereel(data.path())
        .args(["history", "imports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Import History"))
        .stdout(predicate::str::contains("demo.json"));
}

#[test]
fn test_backup_lifecycle() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());

    codereel(data.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));

    codereel(data.path())
        .args(["backup", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project data to backup"));

    codereel(data.path()).arg("import").arg(&input).assert().success();

    codereel(data.path())
        .args(["backup", "create", "--notes", "before demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup-"));

    codereel(data.path())
        .args(["backup", "list", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available Backups"))
        .stdout(predicate::str::contains("before demo"));

    codereel(data.path())
        .args(["backup", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manual"));

    codereel(data.path())
        .args(["backup", "restore", "backup-missing"])
        .assert()
        .failure();

    codereel(data.path())
        .args(["backup", "delete", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));
}

#[test]
fn test_templates_saved_from_export() {
    let data = TempDir::new().unwrap();
    let input = valid_project(data.path());
    codereel(data.path()).arg("import").arg(&input).assert().success();

    codereel(data.path())
        .args(["export", "--format", "xml", "--save-template", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved template 'web'"));

    codereel(data.path())
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web"));

    let output = data.path().join("from-template.xml");
    codereel(data.path())
        .arg("export")
        .arg(&output)
        .args(["--template", "web"])
        .assert()
        .success();
    assert!(fs::read_to_string(&output).unwrap().contains("<"));

    codereel(data.path())
        .args(["template", "delete", "web"])
        .assert()
        .success();

    codereel(data.path())
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates saved."));
}

//! Integration tests for the pinlock binary

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process;
use tempfile::TempDir;

fn create_test_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("pinlock_test_")
        .tempdir()
        .expect("Failed to create temp directory")
}

fn pinlock(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("pinlock").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("PINLOCK_OVERRIDES")
        .env_remove("PINLOCK_OVERRIDE_FILE")
        .env_remove("PINLOCK_IGNORE");
    cmd
}

/// Configuration with a shell resolver that records its request and prints a fixed lock.
#[cfg(unix)]
fn write_shell_resolver_config(dir: &Path) {
    fs::write(
        dir.join("pinlock.toml"),
        r#"
configurations = ["runtime"]
overrides = "com.example:foo:1.2.0"

[resolver]
command = ["sh", "-c", "cat > request.json; echo '{\"com.example:foo\": {\"locked\": \"1.2.0\"}, \"com.example:bar\": {\"locked\": \"2.0.0\"}}'"]
"#,
    )
    .unwrap();
}

fn git_available() -> bool {
    process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Work tree at `<dir>/work` pushing to a bare remote at `<dir>/remote.git`.
fn init_repository_with_remote(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let remote = dir.join("remote.git");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--bare"]);

    let work = dir.join("work");
    fs::create_dir_all(&work).unwrap();
    git(&work, &["init"]);
    git(&work, &["config", "user.name", "Test User"]);
    git(&work, &["config", "user.email", "test@example.com"]);
    git(&work, &["config", "commit.gpgsign", "false"]);
    git(&work, &["commit", "--allow-empty", "-m", "init"]);
    git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
    git(&work, &["push", "-u", "origin", "HEAD"]);
    (work, remote)
}

// =============================================================================
// forces
// =============================================================================

#[test]
fn test_forces_without_lock_prints_overrides() {
    let temp = create_test_dir();

    pinlock(temp.path())
        .args(["forces", "--overrides", "com.example:foo:1.2.0"])
        .assert()
        .success()
        .stdout("com.example:foo:1.2.0\n");
}

#[test]
fn test_forces_with_lock_and_new_override() {
    let temp = create_test_dir();
    fs::write(
        temp.path().join("dependencies.lock"),
        r#"{"com.example:foo": {"locked": "1.0.0"}, "com.example:internal": {}}"#,
    )
    .unwrap();

    pinlock(temp.path())
        .args(["forces", "--overrides", "com.example:bar:3.0.0"])
        .assert()
        .success()
        .stdout("com.example:foo:1.0.0\ncom.example:bar:3.0.0\n");
}

#[test]
fn test_forces_project_flag_and_override_file() {
    let temp = create_test_dir();
    let project = temp.path().join("app");
    fs::create_dir_all(&project).unwrap();
    fs::write(
        project.join("override.lock"),
        r#"{"com.example:foo": {"locked": "9.0"}}"#,
    )
    .unwrap();

    pinlock(temp.path())
        .args([
            "forces",
            "--project",
            "app",
            "--override-file",
            "override.lock",
        ])
        .assert()
        .success()
        .stdout("com.example:foo:9.0\n");
}

#[test]
fn test_forces_json_envelope() {
    let temp = create_test_dir();

    let output = pinlock(temp.path())
        .args(["--json", "forces", "--overrides", "g:a:1.0"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert_eq!(envelope["data"]["forces"], serde_json::json!(["g:a:1.0"]));
}

#[test]
fn test_malformed_lock_is_an_input_error() {
    let temp = create_test_dir();
    fs::write(temp.path().join("dependencies.lock"), "{ not json").unwrap();

    pinlock(temp.path())
        .arg("forces")
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("dependencies.lock"));
}

#[test]
fn test_malformed_inline_override_is_an_input_error() {
    let temp = create_test_dir();

    pinlock(temp.path())
        .args(["forces", "--overrides", "com.example:foo"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("com.example:foo"));
}

#[test]
fn test_missing_override_file_is_an_input_error() {
    let temp = create_test_dir();

    let output = pinlock(temp.path())
        .args(["--json", "forces", "--override-file", "absent.lock"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["error"]["code"], "config");
    assert!(
        envelope["error"]["message"]
            .as_str()
            .unwrap()
            .contains("absent.lock")
    );
}

#[test]
fn test_ignore_from_environment_skips_broken_inputs() {
    let temp = create_test_dir();
    fs::write(temp.path().join("dependencies.lock"), "garbage").unwrap();

    pinlock(temp.path())
        .env("PINLOCK_IGNORE", "true")
        .args(["forces", "--overrides", "broken"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_json_error_envelope() {
    let temp = create_test_dir();
    fs::write(temp.path().join("dependencies.lock"), "[]").unwrap();

    let output = pinlock(temp.path())
        .args(["--json", "forces"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["error"]["code"], "config");
}

// =============================================================================
// lifecycle
// =============================================================================

#[test]
fn test_no_subcommand() {
    let temp = create_test_dir();
    pinlock(temp.path()).assert().code(2);
}

#[test]
fn test_generate_without_resolver_command() {
    let temp = create_test_dir();

    pinlock(temp.path())
        .arg("generate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No resolver command configured"));
}

#[test]
fn test_save_before_generate() {
    let temp = create_test_dir();

    pinlock(temp.path())
        .arg("save")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Generated lock not found"));
    assert!(!temp.path().join("dependencies.lock").exists());
}

#[test]
fn test_commit_outside_git_work_tree() {
    let temp = create_test_dir();
    fs::write(temp.path().join("dependencies.lock"), "{}\n").unwrap();

    let output = pinlock(temp.path())
        .args(["--json", "commit"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(
        envelope["error"]["message"]
            .as_str()
            .unwrap()
            .contains("not inside a git work tree")
    );
}

#[test]
fn test_commit_with_relative_project_directory() {
    if !git_available() {
        return;
    }
    let temp = create_test_dir();
    let (work, remote) = init_repository_with_remote(temp.path());
    fs::write(
        work.join("dependencies.lock"),
        "{\n  \"com.example:foo\": {\n    \"locked\": \"1.0.0\"\n  }\n}\n",
    )
    .unwrap();

    pinlock(temp.path())
        .args(["commit", "--project", "work"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Committed 1 lock file(s)"));
    assert_eq!(
        git(&remote, &["log", "-1", "--format=%s"]),
        "Committing dependency lock files"
    );
    assert_eq!(
        git(&remote, &["show", "--name-only", "--format=", "HEAD"]),
        "dependencies.lock"
    );

    // Running again has nothing left to do.
    pinlock(temp.path())
        .args(["commit", "--project", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already committed and pushed"));
}

#[test]
fn test_missing_explicit_config() {
    let temp = create_test_dir();

    pinlock(temp.path())
        .args(["--config", "nope.toml", "forces"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

#[cfg(unix)]
#[test]
fn test_generate_then_save() {
    let temp = create_test_dir();
    write_shell_resolver_config(temp.path());

    pinlock(temp.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));

    let request: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("request.json")).unwrap())
            .unwrap();
    assert_eq!(request["configurations"], serde_json::json!(["runtime"]));
    assert_eq!(request["includeTransitive"], false);
    assert_eq!(
        request["forces"],
        serde_json::json!([{"coordinate": "com.example:foo", "version": "1.2.0"}])
    );

    let generated = temp.path().join("build").join("dependencies.lock");
    let lock: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&generated).unwrap()).unwrap();
    assert_eq!(lock["com.example:foo"]["viaOverride"], "1.2.0");
    assert!(lock["com.example:bar"].get("viaOverride").is_none());
    assert!(!temp.path().join("dependencies.lock").exists());

    pinlock(temp.path())
        .arg("save")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Saved"));
    assert_eq!(
        fs::read(temp.path().join("dependencies.lock")).unwrap(),
        fs::read(&generated).unwrap()
    );

    pinlock(temp.path())
        .arg("save")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
}

#[cfg(unix)]
#[test]
fn test_lock_pipeline_without_commit() {
    let temp = create_test_dir();
    write_shell_resolver_config(temp.path());

    let output = pinlock(temp.path())
        .args(["--json", "lock", "--no-commit"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["data"]["stages"], serde_json::json!(["generate", "save"]));
    assert_eq!(envelope["data"]["save"]["changed"], true);
    assert!(envelope["data"].get("commit").is_none());
    assert!(temp.path().join("dependencies.lock").exists());

    // The saved lock is now applied to builds.
    pinlock(temp.path())
        .args(["forces", "--overrides", ""])
        .assert()
        .success()
        .stdout("com.example:bar:2.0.0\ncom.example:foo:1.2.0\n");
}

#[cfg(unix)]
#[test]
fn test_lock_pipeline_commits_inside_git_work_tree() {
    if !git_available() {
        return;
    }
    let temp = create_test_dir();
    let (work, remote) = init_repository_with_remote(temp.path());
    write_shell_resolver_config(&work);

    let output = pinlock(temp.path())
        .args(["--json", "lock", "--project", "work"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        envelope["data"]["stages"],
        serde_json::json!(["generate", "save", "commit"])
    );
    assert_eq!(envelope["data"]["commit"]["changed"], true);
    assert_eq!(
        git(&remote, &["show", "--name-only", "--format=", "HEAD"]),
        "dependencies.lock"
    );
}

#[cfg(unix)]
#[test]
fn test_resolver_failure_writes_nothing() {
    let temp = create_test_dir();
    fs::write(
        temp.path().join("pinlock.toml"),
        r#"
[resolver]
command = ["sh", "-c", "echo 'could not resolve com.example:foo:9.9.9' >&2; exit 1"]
"#,
    )
    .unwrap();

    pinlock(temp.path())
        .args(["lock", "--no-commit"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("com.example:foo:9.9.9"));
    assert!(!temp.path().join("build").join("dependencies.lock").exists());
    assert!(!temp.path().join("dependencies.lock").exists());
}

//! CLI integration tests for linkden admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use linkden::store::{SqliteStore, Store, UnitOfWork};
use linkden::types::{GENERATED_PASSWORD_LENGTH, User};
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        Command::cargo_bin("linkden")
            .expect("failed to find binary")
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn admin_password(&self) -> String {
        fs::read_to_string(self.data_dir().join(".admin_password"))
            .expect("failed to read password file")
    }
}

fn open_store(ctx: &TestContext) -> SqliteStore {
    let db_path = ctx.data_dir().join("linkden.db");
    SqliteStore::new(&db_path).expect("open store")
}

fn seed_user(ctx: &TestContext, username: &str) {
    let user = User::new(username, &format!("{username}@example.com"), "hunter2xyz")
        .expect("create user");
    let mut work = UnitOfWork::new();
    work.create(user);
    open_store(ctx).commit(work).expect("commit user");
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn init_creates_database_secret_and_password_files() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin password"));

    assert!(ctx.data_dir().join("linkden.db").exists());
    assert!(ctx.data_dir().join(".jwt_secret").exists());
    assert!(ctx.data_dir().join(".admin_password").exists());

    let secret = fs::read_to_string(ctx.data_dir().join(".jwt_secret"))
        .expect("failed to read secret file");
    assert_eq!(secret.len(), 64);
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));

    assert_eq!(ctx.admin_password().len(), GENERATED_PASSWORD_LENGTH);
}

#[test]
fn init_seeds_admin_account_with_written_password() {
    let ctx = TestContext::new();
    ctx.init().success();

    let store = open_store(&ctx);
    let admin = store
        .get_user_by_username("admin")
        .expect("get admin")
        .expect("admin user exists");

    assert!(
        admin
            .verify_password(&ctx.admin_password())
            .expect("verify password")
    );
}

#[cfg(unix)]
#[test]
fn init_writes_owner_only_secret_files() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    for name in [".jwt_secret", ".admin_password"] {
        let mode = fs::metadata(ctx.data_dir().join(name))
            .expect("stat secret file")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600, "{name} should be owner-only");
    }
}

#[test]
fn init_rejects_second_initialization_with_existing_database() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_preserves_existing_users_when_reinitialization_rejected() {
    let ctx = TestContext::new();

    ctx.init().success();
    seed_user(&ctx, "zoe");
    let secret_before = fs::read_to_string(ctx.data_dir().join(".jwt_secret")).expect("secret");

    ctx.init().failure();

    let store = open_store(&ctx);
    assert!(
        store
            .get_user_by_username("zoe")
            .expect("get user")
            .is_some()
    );

    // The signing secret survives too, so existing tokens stay valid.
    let secret_after = fs::read_to_string(ctx.data_dir().join(".jwt_secret")).expect("secret");
    assert_eq!(secret_before, secret_after);
}

// ============================================================================
// Serve Command Tests
// ============================================================================

#[test]
fn serve_requires_initialization() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    Command::cargo_bin("linkden")
        .expect("failed to find binary")
        .args(["serve", "--data-dir"])
        .arg(temp_dir.path())
        .env_remove("LINKDEN_SECRET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server not initialized"));
}

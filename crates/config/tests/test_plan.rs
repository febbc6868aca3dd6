//! Comprehensive test plan for the `courier-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use courier_config::{load, AppConfig, AuthConfig, DeliveryConfig, HttpConfig, MediaConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "COURIER_CONFIG",
    "COURIER__AUTH__SESSION_TTL_SECONDS",
    "COURIER__DATABASE__MAX_CONNECTIONS",
    "COURIER__DATABASE__URL",
    "COURIER__DELIVERY__CHANNEL_CAPACITY",
    "COURIER__DELIVERY__HISTORY_PAGE_SIZE",
    "COURIER__DELIVERY__SEND_TIMEOUT_MS",
    "COURIER__HTTP__ADDRESS",
    "COURIER__HTTP__PORT",
    "COURIER__MEDIA__PUBLIC_BASE_URL",
    "COURIER__MEDIA__UPLOAD_BASE_URL",
    "COURIER__MEDIA__UPLOAD_URL_TTL_SECONDS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(
        config.delivery.channel_capacity,
        defaults.delivery.channel_capacity
    );
    assert_eq!(config.delivery.send_timeout_ms, defaults.delivery.send_timeout_ms);
    assert_eq!(config.media.public_base_url, defaults.media.public_base_url);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/courier.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [delivery]
        channel_capacity = 8
        send_timeout_ms = 1000
        "#,
    );
    let path = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("COURIER_CONFIG", path.to_string_lossy());

    let config = load().expect("configuration load should read the explicit file");
    assert_eq!(config.delivery.channel_capacity, 8);
    assert_eq!(config.delivery.send_timeout().as_secs(), 1);
    assert_eq!(
        config.delivery.history_page_size,
        DeliveryConfig::default().history_page_size
    );
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.media.upload_url_ttl_seconds,
        defaults.media.upload_url_ttl_seconds
    );
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("COURIER__HTTP__PORT", "8080");
    ctx.set_var("COURIER__DELIVERY__SEND_TIMEOUT_MS", "40");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.delivery.send_timeout_ms, 40);
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let url = "sqlite://data/courier-test.db";
    ctx.set_var("COURIER__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_clamps_session_ttl_to_i64_maximum() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let oversized = (i64::MAX as u128 + 42).to_string();
    ctx.set_var("COURIER__AUTH__SESSION_TTL_SECONDS", &oversized);

    let config = load().expect("configuration load should succeed with oversized TTL");
    assert_eq!(
        config.auth.session_ttl_seconds,
        i64::MAX as u64,
        "session TTL should be clamped to i64::MAX"
    );
}

#[test]
#[serial]
fn load_rejects_zero_channel_capacity() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("COURIER__DELIVERY__CHANNEL_CAPACITY", "0");

    let error = load().expect_err("a zero-capacity subscriber buffer is unusable");
    assert!(error.to_string().contains("channel_capacity"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_to_one_day_sessions() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.session_ttl_seconds, 86_400);
}

#[test]
fn media_config_defaults_expire_upload_urls_after_an_hour() {
    let defaults = MediaConfig::default();
    assert_eq!(defaults.upload_url_ttl_seconds, 3_600);
    assert!(defaults.public_base_url.starts_with("http"));
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}

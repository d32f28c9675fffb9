use gharfix_widget::config::WidgetConfig;
use serial_test::serial;
use std::env;
use std::fs;

const BIN: &str = "gharfix-widget";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("GFC_SERVER__PORT");
        env::remove_var("GFC_API_BASE");
        env::remove_var("GFC_TIMING__WELCOME_DELAY_MS");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("CHAT_API_BASE");
        env::remove_var("WIDGET_STORAGE_PATH");
    }
}

// The test harness passes its own flags, so always parse an explicit argv.
fn load(extra: &[&str]) -> WidgetConfig {
    let args = std::iter::once(BIN).chain(extra.iter().copied());
    WidgetConfig::load_from_args(args).expect("Failed to load config")
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.api_base, "https://gharfix-chatbot.onrender.com");
    assert_eq!(config.storage_key, "gfc_conversation_id");
    assert_eq!(config.minimized_key, "gfc_minimized_state");
    assert_eq!(config.quick_actions.len(), 4);
    assert_eq!(
        config.endpoint_url().unwrap().as_str(),
        "https://gharfix-chatbot.onrender.com/chat"
    );
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("GFC_SERVER__PORT", "9090");
        env::set_var("GFC_TIMING__WELCOME_DELAY_MS", "0");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.timing.welcome_delay_ms, 0);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("custom.yaml");
    fs::write(
        &file_path,
        r#"
api_base: "http://localhost:8000"
server:
  port: 7070
quick_actions:
  - key: plumbing
    label: Plumbing
    message_text: I need a plumber
"#,
    )
    .expect("Failed to write temp config");

    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.endpoint_url().unwrap().as_str(), "http://localhost:8000/chat");
    assert_eq!(
        config.quick_action("Plumbing").map(|a| a.message_text.as_str()),
        Some("I need a plumber")
    );
    // Untouched sections keep their defaults
    assert_eq!(config.timing.redirect_open_delay_ms, 1000);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("GFC_SERVER__PORT", "9090");
    }

    let config = load(&["--port", "4040", "--api-base", "http://127.0.0.1:9999"]);
    assert_eq!(config.server.port, 4040);
    assert_eq!(config.api_base, "http://127.0.0.1:9999");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_env_aliases() {
    clear_env_vars();
    unsafe {
        env::set_var("PORT", "5050");
        env::set_var("WIDGET_STORAGE_PATH", "/tmp/gfc-test.json");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 5050);
    assert_eq!(config.server.storage_path, "/tmp/gfc-test.json");

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_env_vars();

    let result = WidgetConfig::load_from_args([BIN, "--config", "does-not-exist.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let cwd_path = "widget.yaml";
    fs::write(
        cwd_path,
        r#"
server:
  port: 6060
"#,
    )
    .expect("Failed to write ./widget.yaml");

    let result = WidgetConfig::load_from_args([BIN]);

    fs::remove_file(cwd_path).unwrap();

    let config = result.expect("Failed to load config");
    assert_eq!(config.server.port, 6060);
}

#![allow(clippy::unwrap_used)]
//! CLI smoke tests to verify basic command functionality.
//!
//! These tests ensure that the binary starts, lists what it knows about and
//! fails with the configuration exit code before touching the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MISSING_KEY_ENV: &str = "LLM_REPL_SMOKE_MISSING_KEY";

/// Runs the binary against an empty config directory.
#[allow(deprecated)]
fn llm_repl(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("llm-repl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .env_remove(MISSING_KEY_ENV);
    cmd
}

fn write_config(config_home: &TempDir, contents: &str) {
    let dir = config_home.path().join("llm-repl");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

fn missing_key_config(config_home: &TempDir) {
    write_config(
        config_home,
        &format!("[provider]\napi_key_env = \"{MISSING_KEY_ENV}\"\n"),
    );
}

#[test]
fn test_help_displays_usage() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chat with language models"))
        .stdout(predicate::str::contains("websocket"))
        .stdout(predicate::str::contains("http"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--personality"));
}

#[test]
fn test_version_displays_version() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_models_list() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("chatgpt"))
        .stdout(predicate::str::contains("chatgpt4"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_personalities_list_shows_presets_and_custom() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        "[personalities.pirate]\ndescription = \"Talks like a pirate\"\npersonality = \"Arr.\"\n",
    );

    llm_repl(&home)
        .arg("personalities")
        .assert()
        .success()
        .stdout(predicate::str::contains("Preset personalities"))
        .stdout(predicate::str::contains("default"))
        .stdout(predicate::str::contains("Custom personalities"))
        .stdout(predicate::str::contains("Talks like a pirate"));
}

#[test]
fn test_unknown_model_is_config_error() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .args(["--model", "llama"])
        .assert()
        .code(exitcode::CONFIG)
        .stderr(predicate::str::contains("model 'llama' not found"));
}

#[test]
fn test_unknown_personality_is_config_error() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .args(["--personality", "ninja"])
        .assert()
        .code(exitcode::CONFIG)
        .stderr(predicate::str::contains("Personality 'ninja' not found"));
}

#[test]
fn test_missing_credential_is_config_error() {
    let home = TempDir::new().unwrap();
    missing_key_config(&home);

    llm_repl(&home)
        .arg("terminal")
        .assert()
        .code(exitcode::CONFIG)
        .stderr(predicate::str::contains(format!(
            "{MISSING_KEY_ENV} not found, please set it in your environment variables"
        )));
}

#[test]
fn test_servers_check_credential_before_binding() {
    let home = TempDir::new().unwrap();
    missing_key_config(&home);

    llm_repl(&home)
        .args(["websocket", "--port", "0"])
        .assert()
        .code(exitcode::CONFIG);
    llm_repl(&home)
        .args(["http", "--port", "0"])
        .assert()
        .code(exitcode::CONFIG);
}

#[test]
fn test_malformed_config_is_config_error() {
    let home = TempDir::new().unwrap();
    write_config(&home, "[repl\nmodel = ");

    llm_repl(&home)
        .arg("models")
        .assert()
        .code(exitcode::CONFIG)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_server_help() {
    let home = TempDir::new().unwrap();
    llm_repl(&home)
        .args(["http", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--capacity"));
}

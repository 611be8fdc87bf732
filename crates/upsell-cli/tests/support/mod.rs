use assert_cmd::Command;
use std::fs;
use std::path::Path;

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    let binary = assert_cmd::cargo::cargo_bin!("kactus-upsell");
    let mut command = Command::new(binary);
    command.env("HOME", temp_home.path());
    command.env("XDG_CONFIG_HOME", temp_home.path().join(".config"));
    command.env_remove("KACTUS_UPSELL_LOG");
    (command, temp_home)
}

/// Points the api at a closed local port so nothing leaves the machine.
pub fn write_valid_config(home: &Path) {
    write_config(
        home,
        r#"
version = 1

[api]
base_url = "http://127.0.0.1:9"
timeout_secs = 1

[account]
login = "octocat"
email = "octocat@example.com"
"#,
    );
}

pub fn write_config(home: &Path, raw: &str) {
    let config_dir = home.join(".config").join("kactus-upsell");
    fs::create_dir_all(&config_dir).expect("create config dir");
    fs::write(config_dir.join("config.toml"), raw).expect("write config");
}

pub fn assert_timestamp_log_names(entries: &[std::fs::DirEntry]) {
    assert!(!entries.is_empty(), "expected at least one diagnostics log");

    for entry in entries {
        let name = entry
            .file_name()
            .into_string()
            .expect("diagnostics filename utf8");
        let stem = name
            .strip_suffix(".log")
            .unwrap_or_else(|| panic!("diagnostics file should end with .log: {name}"));
        assert!(
            !stem.is_empty() && stem.chars().all(|character| character.is_ascii_digit()),
            "diagnostics filename must be <timestamp>.log, got: {name}"
        );
    }
}

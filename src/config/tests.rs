//! Tests for config functionality.

use crate::config::ExecutorConfig;
use crate::executor::{Executor, ExitValues};
use crate::launcher::Launcher;
use crate::os::OsFamily;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = ExecutorConfig::default();

    assert_eq!(config.timeout_ms, None);
    assert_eq!(config.working_dir, None);
    assert_eq!(config.exit_values, None);
    assert!(!config.ignore_exit_values);
    assert_eq!(config.os_family, None);
    assert_eq!(config.shell, "cmd");
    assert_eq!(config.buffer_size, 1024);
    assert_eq!(config.poll_interval_ms, 50);
    assert_eq!(config.stream_stop_timeout_ms, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_empty_yaml() {
    let config = ExecutorConfig::from_yaml("").unwrap();
    assert_eq!(config, ExecutorConfig::default());
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
timeout_ms: 2000
working_dir: /tmp/work
exit_values: [0, 1, 2]
os_family: windows
shell: cmd.exe
buffer_size: 4096
poll_interval_ms: 10
stream_stop_timeout_ms: 500
"#;
    let config = ExecutorConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.timeout(), Some(Duration::from_millis(2000)));
    assert_eq!(config.working_dir, Some(PathBuf::from("/tmp/work")));
    assert_eq!(config.exit_value_policy(), ExitValues::allowed([0, 1, 2]));
    assert_eq!(config.os_family(), OsFamily::Windows);
    assert_eq!(config.shell, "cmd.exe");
    assert_eq!(config.buffer_size, 4096);
    assert_eq!(config.poll_interval_ms, 10);
    assert_eq!(config.stream_stop_timeout_ms, Some(500));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
timeout_ms: 100
some_future_setting: true
"#;
    let config = ExecutorConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.timeout_ms, Some(100));
}

#[test]
fn test_invalid_values_are_rejected() {
    for yaml in [
        "buffer_size: 0",
        "poll_interval_ms: 0",
        "timeout_ms: 0",
        "shell: ''",
        "ignore_exit_values: true\nexit_values: [0]",
    ] {
        let err = ExecutorConfig::from_yaml(yaml).unwrap_err();
        assert!(
            err.to_string().contains("config validation failed"),
            "{}: {}",
            yaml,
            err
        );
    }
}

#[test]
fn test_malformed_yaml_is_config_error() {
    let err = ExecutorConfig::from_yaml("timeout_ms: [not a number").unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
    assert_eq!(err.exit_code(), crate::exit_codes::USAGE_ERROR);
}

#[test]
fn test_yaml_roundtrip_preserves_settings() {
    let config = ExecutorConfig {
        timeout_ms: Some(750),
        ignore_exit_values: true,
        os_family: Some(OsFamily::Unix),
        ..ExecutorConfig::default()
    };

    let yaml = config.to_yaml().unwrap();
    assert_eq!(ExecutorConfig::from_yaml(&yaml).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("runexec.yaml");
    std::fs::write(&path, "timeout_ms: 300\nignore_exit_values: true\n").unwrap();

    let config = ExecutorConfig::load(&path).unwrap();
    assert_eq!(config.timeout_ms, Some(300));
    assert_eq!(config.exit_value_policy(), ExitValues::Any);
}

#[test]
fn test_load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let err = ExecutorConfig::load(temp.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_executor_from_config() {
    let config = ExecutorConfig {
        timeout_ms: Some(1500),
        working_dir: Some(PathBuf::from("/srv")),
        exit_values: Some(vec![0, 3]),
        os_family: Some(OsFamily::Windows),
        shell: "cmd.exe".to_string(),
        ..ExecutorConfig::default()
    };

    let executor = Executor::from_config(&config);

    assert_eq!(executor.exit_values(), &ExitValues::allowed([0, 3]));
    assert_eq!(executor.working_dir(), Some(std::path::Path::new("/srv")));
    let watchdog = executor.watchdog().expect("watchdog for timeout");
    assert_eq!(watchdog.timeout(), Some(Duration::from_millis(1500)));
    match executor.launcher() {
        Launcher::ShellWrapping(shell) => assert_eq!(shell.shell(), "cmd.exe"),
        other => panic!("expected shell-wrapping launcher, got {:?}", other),
    }
}

#[test]
fn test_no_timeout_means_no_watchdog() {
    let executor = ExecutorConfig::default().executor();
    assert!(executor.watchdog().is_none());
    assert_eq!(executor.exit_values(), &ExitValues::ZeroOnly);
}

#[test]
fn test_apply_to_sets_stop_timeout() {
    let config = ExecutorConfig {
        stream_stop_timeout_ms: Some(250),
        ..ExecutorConfig::default()
    };

    let router = config.apply_to(crate::pump::StreamRouter::discard());
    assert_eq!(router.stop_timeout(), Some(Duration::from_millis(250)));
}

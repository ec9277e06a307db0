//! Integration tests for config file resolution and graceful degradation
//!
//! Tests that touch SPROUT_CONFIG are marked #[serial] so they do not race
//! on the process environment.

use serde::{Deserialize, Serialize};
use serial_test::serial;
use sprout_common::config::{
    load_toml_config, write_toml_config, ConfigFileResolver, CONFIG_ENV_VAR,
};
use sprout_common::LoggingConfig;
use std::env;
use tempfile::TempDir;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct SampleConfig {
    #[serde(default)]
    port: u16,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_arg() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sprout-env-config.toml");

    let resolver = ConfigFileResolver::new("sprout-test");
    let resolved = resolver.resolve(None);

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(
        resolved,
        Some(std::path::PathBuf::from("/tmp/sprout-env-config.toml"))
    );
}

#[test]
#[serial]
fn test_cli_arg_overrides_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolver = ConfigFileResolver::new("sprout-test");
    let resolved = resolver.resolve(Some(std::path::Path::new("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(std::path::PathBuf::from("/tmp/from-cli.toml")));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_no_path_falls_back_to_defaults() {
    let config: SampleConfig = load_toml_config(None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number").unwrap();

    let result: sprout_common::Result<SampleConfig> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(sprout_common::Error::Config(_))));
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("sprout.toml");

    let config = SampleConfig {
        port: 8123,
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    };
    write_toml_config(&config, &path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists(), "temp file should be renamed");

    let loaded: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(loaded, config);
}

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use slashspot_cli::commands::{config, doctor, spots, version};
use slashspot_core::config::LoadOptions;
use tempfile::TempDir;

const SPOTS_JSON: &str = "{\n\t\"B1-2020-01-05\": {\n\t\t\"ID\": \"B1\",\n\t\t\"OpenDate\": \"2020-01-05\",\n\t\t\"RegDate\": \"2020-01-05\",\n\t\t\"RegisteredBy\": \"alice\"\n\t}\n}";

#[test]
fn config_reports_env_sources_and_redacts_the_secret() {
    let dir = TempDir::new().expect("tempdir");
    let data_dir = dir.path().display().to_string();
    with_env(
        &[
            ("SLASHSPOT_SLACK_SIGNING_SECRET", "8f742231b10e8888abcd99yyyzzz85a5"),
            ("SPOT_DATA_DIR", &data_dir),
        ],
        || {
            let result = config::run(options(&dir));
            assert_eq!(result.exit_code, 0, "{}", result.output);

            assert!(!result.output.contains("8f742231b10e8888abcd99yyyzzz85a5"));
            assert!(result
                .output
                .contains("- slack.signing_secret = ***85a5 (source: env (SLASHSPOT_SLACK_SIGNING_SECRET))"));
            assert!(result.output.contains("(source: env (SPOT_DATA_DIR))"));
            assert!(result.output.contains("- server.port = 8080 (source: default)"));
        },
    );
}

#[test]
fn config_fails_without_signing_secret() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&[], || {
        let result = config::run(options(&dir));
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("slack.signing_secret"));
    });
}

#[test]
fn doctor_passes_with_valid_env_and_empty_data_dir() {
    let dir = TempDir::new().expect("tempdir");
    let data_dir = dir.path().join("data").display().to_string();
    with_env(&[("SLASHSPOT_SLACK_SIGNING_SECRET", "s3cret"), ("SPOT_DATA_DIR", &data_dir)], || {
        let result = doctor::run(options(&dir), true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, vec!["config_validation", "data_dir_writable", "store_readability"]);
    });
}

#[test]
fn doctor_flags_a_corrupt_store() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("spots.json"), "{ nope").expect("corrupt");
    let data_dir = dir.path().display().to_string();
    with_env(&[("SLASHSPOT_SLACK_SIGNING_SECRET", "s3cret"), ("SPOT_DATA_DIR", &data_dir)], || {
        let result = doctor::run(options(&dir), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] store_readability:"), "{}", result.output);
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&[], || {
        let result = doctor::run(options(&dir), true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn spots_lists_the_store_without_rewriting_it() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("spots.json");
    fs::write(&path, SPOTS_JSON).expect("seed store");
    let data_dir = dir.path().display().to_string();
    with_env(&[("SLASHSPOT_SLACK_SIGNING_SECRET", "s3cret"), ("SPOT_DATA_DIR", &data_dir)], || {
        let result = spots::run(options(&dir), true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["spots"][0]["ID"], "B1");
        assert_eq!(payload["spots"][0]["RegisteredBy"], "alice");
    });

    assert_eq!(fs::read_to_string(&path).expect("store"), SPOTS_JSON);
}

#[test]
fn spots_reports_a_corrupt_store() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("spots.json"), "[1, 2").expect("corrupt");
    let data_dir = dir.path().display().to_string();
    with_env(&[("SLASHSPOT_SLACK_SIGNING_SECRET", "s3cret"), ("SPOT_DATA_DIR", &data_dir)], || {
        let result = spots::run(options(&dir), false);
        assert_eq!(result.exit_code, spots::EXIT_STORE);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "spots");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "store_corrupt");
    });
}

#[test]
fn version_defaults_build_metadata_to_undefined() {
    let result = version::run();
    assert_eq!(result.exit_code, 0);
    assert!(result.output.starts_with(&format!("slashspot {}", version::VERSION)));
    if option_env!("SLASHSPOT_GIT_HASH").is_none() {
        assert!(result.output.contains("git hash: undefined"));
    }
}

/// Points config discovery at a file that does not exist so a stray
/// `slashspot.toml` in the working directory cannot leak into the test.
fn options(dir: &TempDir) -> LoadOptions {
    LoadOptions {
        config_path: Some(PathBuf::from(dir.path()).join("absent.toml")),
        ..LoadOptions::default()
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLASHSPOT_STORAGE_DATA_DIR",
        "SLASHSPOT_STORAGE_DATA_FILE",
        "SPOT_DATA_DIR",
        "SPOT_DATA_FILE",
        "SLASHSPOT_SLACK_SIGNING_SECRET",
        "SPOT_SLACK_SIGNING_SECRET",
        "SLASHSPOT_SLACK_MAX_REQUEST_AGE_SECS",
        "SLASHSPOT_SLACK_COMMAND",
        "SLASHSPOT_SERVER_BIND_ADDRESS",
        "SLASHSPOT_SERVER_PORT",
        "SPOT_SERVER_PORT",
        "SLASHSPOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SLASHSPOT_LOGGING_LEVEL",
        "SLASHSPOT_LOGGING_FORMAT",
        "SLASHSPOT_LOG_LEVEL",
        "SLASHSPOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

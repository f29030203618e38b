use std::fs;
use std::path::Path;

use serde::Serialize;
use slashspot_core::config::{AppConfig, LoadOptions};
use slashspot_core::store::read_snapshot;

use super::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let data_dir = check_data_dir(&config.storage.data_dir);
            let data_dir_ok = data_dir.status == CheckStatus::Pass;
            checks.push(data_dir);
            checks.push(if data_dir_ok {
                check_store(&config.storage.file_path())
            } else {
                skipped("store_readability", "skipped because the data directory is not usable")
            });
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("data_dir_writable", "skipped because configuration did not load"));
            checks.push(skipped("store_readability", "skipped because configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, details: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: details.to_string() }
}

/// Creates the data directory if needed and proves a file can be written there.
fn check_data_dir(data_dir: &Path) -> DoctorCheck {
    let probe = data_dir.join(".slashspot-doctor-probe");
    let result = fs::create_dir_all(data_dir)
        .and_then(|()| fs::write(&probe, b"probe"))
        .and_then(|()| fs::remove_file(&probe));

    match result {
        Ok(()) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Pass,
            details: format!("`{}` is writable", data_dir.display()),
        },
        Err(error) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Fail,
            details: format!("`{}` is not writable: {error}", data_dir.display()),
        },
    }
}

fn check_store(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "store_readability",
            status: CheckStatus::Pass,
            details: format!("`{}` does not exist yet and will be created on start", path.display()),
        };
    }

    match read_snapshot(path) {
        Ok(spots) => DoctorCheck {
            name: "store_readability",
            status: CheckStatus::Pass,
            details: format!("`{}` decoded with {} registration(s)", path.display(), spots.len()),
        },
        Err(error) => DoctorCheck {
            name: "store_readability",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

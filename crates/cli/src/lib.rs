pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use slashspot_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "slashspot",
    about = "Slashspot operator CLI",
    long_about = "Inspect slashspot configuration, check runtime readiness, and read the spot store.",
    after_help = "Examples:\n  slashspot doctor --json\n  slashspot config\n  slashspot spots"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, data directory access, and store readability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List every registration in the spot store without modifying it")]
    Spots {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print version and build metadata")]
    Version,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Spots { json } => commands::spots::run(options, json),
        Command::Version => commands::version::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

use std::process::ExitCode;

fn main() -> ExitCode {
    slashspot_cli::run()
}

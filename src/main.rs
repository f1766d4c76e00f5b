use clap::Parser;
use dirshape::cli::{Cli, exit_code, run_cli};
use dirshape::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::from(exit_code(&e))
        }
    }
}

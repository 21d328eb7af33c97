use std::process::ExitCode;

use clap::Parser;
use mailforge::cli::Arguments;

fn main() -> ExitCode {
    let args = Arguments::parse();

    match mailforge::cli::run_cli(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

use clap::Parser;
use dirshift::cli::{self, Cli};
use dirshift::logging;
use dirshift::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Cli::parse();
    logging::init(args.verbose());

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {e}"));
            ExitCode::FAILURE
        }
    }
}

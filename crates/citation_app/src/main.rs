mod app;
mod cli;
mod effects;
mod render;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

fn main() -> ExitCode {
    let args = cli::Args::parse();
    engine_logging::initialize(args.log_destination(), args.log_level());

    match app::run(&args) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("cite-harvest failed: {:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

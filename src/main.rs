use clap::Parser;
use quantkit::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

use clap::Parser;
use signalfolio::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

use clap::Parser;
use dirsort::cli::{self, Cli};
use dirsort::logging;
use std::path::Path;
use std::process;

fn main() {
    let cli = Cli::parse();

    // Keep the appender guard alive until exit so buffered events flush.
    let _log_guard = logging::init(Path::new("logs"));

    process::exit(cli::run(cli));
}

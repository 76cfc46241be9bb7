use std::path::PathBuf;

use anyhow::Context;
use log::LevelFilter;
use scribe::logging::{self, Logger};
use scribe::{Config, Session};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, verbose) = parse_args(&args);

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::init(Logger::new(level));

    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default().context("failed to load default configuration")?,
    };

    let session = Session::new(config).context("failed to build session")?;

    println!("scribe {}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("{}", session.menu_outline());
    Ok(())
}

fn parse_args(args: &[String]) -> (Option<PathBuf>, bool) {
    let mut config_path = None;
    let mut verbose = false;
    for arg in args {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            other => config_path = Some(PathBuf::from(other)),
        }
    }
    (config_path, verbose)
}

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod azure;
mod cli;
mod config;
mod error;
mod marketplace;
mod params;
mod state;
mod util;
mod workflow;

use cli::{Command, RootArgs};

fn main() {
    init_tracing();
    let args = RootArgs::parse();

    let result = match args.command {
        Command::Deploy(args) => workflow::run_deploy(args),
        Command::Destroy(args) => workflow::run_destroy(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

mod args;
mod commands;

use anyhow::Result;
use args::Cli;
use chainbind_config::{logging, Settings};
use clap::Parser;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(registry) = &cli.registry {
        settings.registry.base_path = registry.clone();
    }
    logging::init(&settings.logging)?;
    debug!("Using registry at {}", settings.registry.base_path.display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::execute(cli.chain, &settings.registry, &cli.command, &mut out)
}

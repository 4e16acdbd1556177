use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gk_core::config::ServiceConfig;
use gk_effects::EffectRegistry;

pub mod cli;
pub mod commands;
pub mod render;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config puis appliquer les overrides CLI
    let config = resolve_config(&cli)?;
    let mut settings = config.conversion.clone();
    cli.conversion.apply(&mut settings);
    if cli.output.color {
        settings.color_mode = true;
    }
    log::debug!("conversion : {settings:?}");

    // 4. Registre d'effets partagé, immuable
    let registry = Arc::new(EffectRegistry::new());

    match &cli.command {
        Command::Effects => commands::list_effects(&registry),
        Command::Image { path } => commands::convert_image(registry, path, &settings, cli.output),
        Command::Video(args) => {
            commands::run_video(config.video, registry, args, &settings, cli.output).await
        }
    }
}

/// Config TOML si `--config` est fourni, défauts sinon.
fn resolve_config(cli: &Cli) -> Result<ServiceConfig> {
    match cli.config {
        Some(ref path) => {
            let config = gk_core::config::load_config(path)?;
            log::info!("config chargée : {}", path.display());
            Ok(config)
        }
        None => Ok(ServiceConfig::default()),
    }
}

pub mod admin;
pub mod cli;
pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod executor;
pub mod installation;
pub mod password;
pub mod pipeline;
pub mod settings;
pub mod step;

pub use error::InstallError;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::executor::CommandExecutor;
use crate::installation::{InstallPaths, Installation, InstallationConfig};
use crate::pipeline::InstallOutcome;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Resolves the install paths from the CLI, defaulting below `--dir`.
fn install_paths(opts: &cli::InstallArgs) -> InstallPaths {
    let defaults = InstallPaths::under(&opts.dir);
    InstallPaths {
        install_dir: defaults.install_dir,
        migrations_dir: opts.migrations.clone().unwrap_or(defaults.migrations_dir),
        assets_dir: opts.assets.clone().unwrap_or(defaults.assets_dir),
        public_assets_dir: opts.public.clone().unwrap_or(defaults.public_assets_dir),
    }
}

fn load_config(common: &cli::CommonArgs) -> Result<InstallationConfig> {
    let form = config::load_form(&common.file)
        .with_context(|| format!("failed to load setup form from {}", common.file))?;
    let config = InstallationConfig::from_form(&form, &common.base_url)?;
    Ok(config)
}

pub fn run_install(
    opts: &cli::InstallArgs,
    executor: Arc<dyn CommandExecutor>,
) -> Result<InstallOutcome> {
    let mut config = load_config(&opts.common)?;
    config.debug = opts.debug;

    let installation = Installation::new(install_paths(opts), executor).with_dry_run(opts.dry_run);
    let mut pipeline = installation.builder().config(config).build()?;
    let outcome = pipeline.run()?;

    info!(
        "forum installed ({} step(s)); administrator account {} is ready",
        outcome.steps_completed, outcome.admin_user_id
    );
    Ok(outcome)
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let config = load_config(&opts.common)?;
    info!("validation successful:\n{:#?}", config);
    Ok(())
}

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the forum from the given setup form
    Install(InstallArgs),

    /// Validate the given setup form without touching anything
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML or JSON file holding the setup form
    #[arg(short, long, default_value = "install.yaml")]
    pub file: Utf8PathBuf,

    /// Public base URL of the forum
    #[arg(short, long)]
    pub base_url: String,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory the configuration file is written to
    #[arg(short, long, default_value = ".")]
    pub dir: Utf8PathBuf,

    /// Directory holding the SQL migrations (default: <DIR>/migrations)
    #[arg(long)]
    pub migrations: Option<Utf8PathBuf>,

    /// Directory holding the bundled assets (default: <DIR>/assets)
    #[arg(long)]
    pub assets: Option<Utf8PathBuf>,

    /// Directory the assets are published to (default: <DIR>/public/assets)
    #[arg(long)]
    pub public: Option<Utf8PathBuf>,

    /// Enable debug mode in the written configuration
    #[arg(long)]
    pub debug: bool,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Log verbosity, mapped onto `tracing` levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}

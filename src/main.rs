use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use forum_installer::executor::{CommandExecutor, RealCommandExecutor};
use forum_installer::{cli, init_logging, run_install, run_validate};
use tracing::error;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    let log_level = match &args.command {
        cli::Commands::Install(opts) => opts.common.log_level,
        cli::Commands::Validate(opts) => opts.common.log_level,
        cli::Commands::Completions(_) => cli::LogLevel::Error,
    };
    init_logging(log_level)?;

    let result = match &args.command {
        cli::Commands::Install(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            run_install(opts, executor).map(|_| ())
        }
        cli::Commands::Validate(opts) => run_validate(opts),
        cli::Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(opts.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}

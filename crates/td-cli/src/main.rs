use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use td_cli::commands::{calendar, dispatch, tickets};
use td_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Dispatch { params, dry_run }) => {
            let config = Config::load_from(cli.config.as_deref())?;
            tracing::debug!(?config, "loaded configuration");
            dispatch::run(&mut out, &config, params, *dry_run)?;
        }
        Some(Commands::Calendar {
            member,
            from,
            timezone,
        }) => {
            let config = Config::load_from(cli.config.as_deref())?;
            calendar::run(&mut out, &config, member, *from, *timezone)?;
        }
        Some(Commands::Tickets { params }) => {
            let config = Config::load_from(cli.config.as_deref())?;
            tickets::run(&mut out, &config, params)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tsnctl_config::{Config, LogFormat, LogSection};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A broken config still gets a subscriber so the failure is reported.
    let config = commands::load_config(&cli.global);
    let log = config.as_ref().map_or_else(|_| LogSection::default(), |c| c.log.clone());
    init_tracing(cli.global.verbose, &log);

    if let Err(err) = run(cli, config).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, log: &LogSection) {
    let level = match verbosity {
        0 => log.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr);

    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(cli: Cli, config: Result<Config, CliError>) -> Result<(), CliError> {
    tracing::debug!(command = ?cli.command, "dispatching command");
    match cli.command {
        // `config path` and `config init` work even when the file is broken
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, config),
        Command::Check(args) => commands::check::handle(&args, &cli.global, &config?).await,
        Command::Gcl(args) => commands::gcl::handle(&args, &cli.global),
    }
}

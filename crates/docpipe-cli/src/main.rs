mod cli;
mod commands;

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use docpipe_config::Config;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // Logs go to stderr; stdout may carry document text
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        cli::Commands::Run {
            document,
            output,
            options,
            phase,
            artifact,
            plugin_dir,
        } => commands::run::handle(
            commands::run::RunArgs {
                document,
                output,
                options,
                phase,
                artifact,
                plugin_dir,
            },
            &config,
        ),
        cli::Commands::Plugins { plugin_dir } => commands::plugins::handle(plugin_dir, &config),
        cli::Commands::Provenance { artifact, json } => {
            commands::provenance::handle(&artifact, json, &config)
        }
    }
}

/// Pipeline errors get a delimited block so they stand out in renderer logs
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<docpipe_core::Error>() {
        Some(core) => {
            eprintln!("BEGIN PIPELINE ERROR MSG");
            eprintln!("{}", core);
            eprintln!("END PIPELINE ERROR MSG");
        }
        None => eprintln!("Error: {:#}", err),
    }
}

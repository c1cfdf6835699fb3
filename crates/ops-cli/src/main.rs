//! opsctl binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ops_cli::cli::{Cli, Commands};
use ops_cli::commands::{EventsCommand, IngestCommand, LifecycleCommand};
use ops_cli::output::OutputFormat;
use ops_cli::{AppContext, CliError};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = AppContext::from_cli(&cli)?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::List(args) => EventsCommand::new(&ctx).list(&mut stdout, &format, args).await,
        Commands::Count(args) => EventsCommand::new(&ctx).count(&mut stdout, &format, args).await,
        Commands::Summary => EventsCommand::new(&ctx).summary(&mut stdout, &format).await,
        Commands::Get { id } => EventsCommand::new(&ctx).get(&mut stdout, &format, id).await,
        Commands::Claim { id } => {
            LifecycleCommand::new(&ctx)
                .claim(&mut stdout, &format, id)
                .await
        }
        Commands::Release { id } => {
            LifecycleCommand::new(&ctx)
                .release(&mut stdout, &format, id)
                .await
        }
        Commands::Silence { id, duration } => {
            LifecycleCommand::new(&ctx)
                .silence(&mut stdout, &format, id, *duration)
                .await
        }
        Commands::Unsilence { id } => {
            LifecycleCommand::new(&ctx)
                .unsilence(&mut stdout, &format, id)
                .await
        }
        Commands::BatchSilence { ids, duration } => {
            LifecycleCommand::new(&ctx)
                .batch_silence(&mut stdout, &format, ids, *duration)
                .await
        }
        Commands::Report(args) => IngestCommand::new(&ctx).report(&mut stdout, &format, args).await,
        Commands::Resolve { fingerprint } => {
            IngestCommand::new(&ctx)
                .resolve(&mut stdout, &format, fingerprint)
                .await
        }
    }
}

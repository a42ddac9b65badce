//! Waypoint operation control CLI.
//!
//! Binary name: `wpt`
//!
//! Parses CLI arguments, opens the operation database, starts the in-process
//! worker pool and dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use waypoint_observe::LogFormat;

use cli::{Cli, Commands, StartOperation};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,waypoint=debug",
        _ => "trace",
    };
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    waypoint_observe::init_tracing(filter, format, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))?;

    let result = run(cli).await;
    waypoint_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need no running engine
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "wpt", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Init => return cli::init::init(cli.json).await,
        _ => {}
    }

    let state = AppState::init().await?;
    tracing::debug!(
        data_dir = %state.data_dir.display(),
        workers = state.config.workers,
        "engine ready"
    );

    let json = cli.json;
    let requester = cli.requester.as_str();
    let result = match cli.command {
        Commands::Start { operation } => match operation {
            StartOperation::Arith => cli::operation::start_arith(&state, requester, json).await,
            StartOperation::Tally {
                file,
                group_by,
                count_by,
            } => {
                cli::operation::start_tally(&state, requester, &file, group_by, count_by, json)
                    .await
            }
        },
        Commands::Pause { id } => cli::operation::pause(&state, &id, json).await,
        Commands::Resume { id } => cli::operation::resume(&state, &id, json).await,
        Commands::Cancel { id } => cli::operation::cancel(&state, &id, json).await,
        Commands::Status { id } => cli::operation::status(&state, &id, json).await,
        Commands::List { all } => {
            let filter = if all { None } else { Some(requester) };
            cli::operation::list(&state, filter, json).await
        }
        Commands::Init | Commands::Completions { .. } => Ok(()),
    };

    state.shutdown().await;
    result
}

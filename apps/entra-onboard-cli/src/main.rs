//! entra-onboard - create a Microsoft Entra ID user from the command line
//!
//! Reads application credentials from the environment (or a `.env` file),
//! authenticates with the client-credentials grant and creates one user
//! through Microsoft Graph.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use entra_onboard::{pipeline, StageError, ENV_REQUEST_TIMEOUT};

/// Provision a Microsoft Entra ID user through Microsoft Graph
#[derive(Parser, Debug)]
#[command(name = "entra-onboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file to read; it must exist when given (default: ./.env if present)
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Deadline in seconds for each network request
    #[arg(
        long,
        value_name = "SECS",
        env = ENV_REQUEST_TIMEOUT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: Option<u64>,

    /// Print the user payload (password redacted) without calling any service
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Bad arguments are configuration errors; help and version exit normally
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            std::process::exit(1);
        }
        e.exit()
    });

    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,entra_onboard=info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), StageError> {
    tracing::debug!(env_file = ?cli.env_file, dry_run = cli.dry_run, "starting");

    let mut config = pipeline::load_config(cli.env_file.as_deref())?;

    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    if cli.dry_run {
        println!("{}", pipeline::render_user_draft(&config)?);
        return Ok(());
    }

    let created = pipeline::run(config).await?;
    println!("{}", created.summary());

    Ok(())
}

//! `cpr-guide` - Step-by-step CPR guidance in the terminal

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use cpr_guide::cli::args::Cli;
use cpr_guide::cli::commands;
use cpr_guide::error::ExitCode;
use cpr_guide::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format.into(), cli.verbose, cli.color);
    }

    let shutdown = CancellationToken::new();
    let signal_exit = Arc::new(AtomicI32::new(ExitCode::SUCCESS));
    tokio::spawn(handle_signals(shutdown.clone(), Arc::clone(&signal_exit)));

    let result = commands::dispatch(cli, shutdown).await;

    match result {
        Ok(()) => std::process::exit(signal_exit.load(Ordering::SeqCst)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Cancels `shutdown` on the first SIGINT/SIGTERM and exits on the second.
async fn handle_signals(shutdown: CancellationToken, exit_code: Arc<AtomicI32>) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            tracing::warn!(error = %err, "failed to register SIGTERM handler");
            if tokio::signal::ctrl_c().await.is_ok() {
                exit_code.store(ExitCode::INTERRUPTED, Ordering::SeqCst);
                shutdown.cancel();
            }
            return;
        }
    };

    let code = tokio::select! {
        _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
        _ = sigterm.recv() => ExitCode::TERMINATED,
    };
    exit_code.store(code, Ordering::SeqCst);
    shutdown.cancel();

    eprintln!("\nStopping guidance... (press Ctrl+C again to force)");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
        _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
    }
}

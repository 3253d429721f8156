//! `run`: an interactive guidance session in the terminal.
//!
//! Snapshots are rendered as they change and line commands are read from
//! stdin. The session ends on `q`, end of input, or a shutdown signal; in
//! every case the engine is stopped before returning.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::load_config;
use crate::cli::args::RunArgs;
use crate::cli::input::{HELP, LineCommand, parse_line};
use crate::cli::render::Renderer;
use crate::config::ResolvedConfig;
use crate::error::GuideError;
use crate::guidance::{self, EnginePorts};
use crate::observability::{EventEmitter, init_metrics};
use crate::ports::{ConsoleNarrator, TerminalBell};

/// Run a session until the user quits or `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the events file or
/// metrics listener cannot be opened, or the engine stops unexpectedly.
pub async fn run(args: &RunArgs, shutdown: CancellationToken) -> Result<(), GuideError> {
    let load_result = load_config(args.config.as_deref(), args.overrides())?;
    let ResolvedConfig { catalog, settings } = load_result.config.as_ref().clone();

    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }

    let events = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };
    let ports = if args.mute {
        EnginePorts::silent()
    } else {
        EnginePorts::new(
            Arc::new(ConsoleNarrator::stdout()),
            Arc::new(TerminalBell::new()),
        )
    }
    .with_events(Arc::new(events));

    let (engine, task) = guidance::spawn(catalog.clone(), settings, ports)?;
    let mut renderer = Renderer::new(catalog, std::io::stdout());
    let mut updates = WatchStream::new(engine.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    engine.start().await?;

    let result: Result<(), GuideError> = loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("shutdown requested");
                break Ok(());
            }
            Some(snapshot) = updates.next() => {
                if let Err(err) = renderer.render(&snapshot) {
                    break Err(err.into());
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(LineCommand::Engine(command)) => {
                        if let Err(err) = engine.send(command).await {
                            break Err(err.into());
                        }
                    }
                    Ok(LineCommand::Quit) => break Ok(()),
                    Ok(LineCommand::Help) => println!("{HELP}"),
                    Err(unknown) => eprintln!("{unknown}"),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break Ok(());
                }
                Err(err) => break Err(err.into()),
            },
        }
    };

    let cycle = engine.snapshot().cycle_count;
    let stopped = engine.stop().await;
    engine.shutdown();
    if let Err(err) = task.await {
        warn!(error = %err, "guidance engine task failed");
    }
    result?;
    stopped?;

    println!("Guidance stopped in cycle {cycle}.");
    Ok(())
}

mod cli;

use std::{process::ExitCode, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use prun_core::{CoreError, RunConfig, Summary, select_console};
use prun_observe::{local_offset, logger_init};

use cli::{Cli, EXIT_USAGE};

/// Exit status of a run stopped by the operator.
const EXIT_INTERRUPTED: u8 = 130;
/// Exit status for failures while bringing up logging or the runtime.
const EXIT_BOOTSTRAP: u8 = 3;
/// Time left to blocking tasks (the stdin reader) when the runtime is dropped.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
        Err(e) => e.exit(),
    };

    // Must be read while the process is still single-threaded.
    let offset = local_offset();

    if let Err(e) = logger_init(&cli.logger_config(offset)) {
        eprintln!("prun: {e}");
        return ExitCode::from(EXIT_BOOTSTRAP);
    }

    match cli.run_config(offset).map_err(anyhow::Error::from).and_then(execute) {
        Ok(summary) if summary.interrupted => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("prun: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn execute(cfg: RunConfig) -> anyhow::Result<Summary> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let summary = runtime.block_on(async {
        let cancel = CancellationToken::new();
        tokio::spawn(watch_interrupt(cancel.clone()));

        let console = select_console();
        prun_core::run(cfg, tokio::io::stdin(), console, cancel).await
    });

    // Stdin is read on a blocking thread that cannot be interrupted.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    summary.map_err(anyhow::Error::from)
}

async fn watch_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!(target: "prun", "interrupt received; stopping");
            cancel.cancel();
        }
        Err(e) => warn!(target: "prun", error = %e, "cannot listen for interrupts"),
    }
}

fn exit_code(e: &anyhow::Error) -> u8 {
    let code = e
        .downcast_ref::<CoreError>()
        .map_or(EXIT_BOOTSTRAP, |core| u8::try_from(core.exit_code()).unwrap_or(EXIT_BOOTSTRAP));
    debug!(target: "prun", code, error = %e, "exiting with error");
    code
}

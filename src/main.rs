// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use gitprobe::cli::Cli;
use gitprobe::http::ProbeClient;
use gitprobe::loader::{load_targets, LoadError};
use gitprobe::sink::{ResultSink, SinkOptions};
use gitprobe::worker::WorkerPool;
use log::{debug, info};
use simple_logger::SimpleLogger;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level()).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Failed to start runtime: {}", e).red().bold());
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("{:#}", e).red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.config().context("invalid configuration")?;
    let cancel = CancellationToken::new();
    tokio::spawn(terminate(cancel.clone()));

    let client = Arc::new(ProbeClient::new(&config).context("initializing http client")?);

    let targets = match load_targets(cli.target_source(), config.path_suffix(), cancel.clone()).await {
        Ok(rx) => rx,
        Err(LoadError::NoTargets) => {
            eprintln!("{}", "You need to specify a target (see --help)".red().bold());
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e).context("Failed to load targets"),
    };

    let mut sink = ResultSink::new(SinkOptions {
        debug: config.debug(),
        output: config.output().map(|p| p.to_path_buf()),
        progress: !cli.no_progress,
    })?;

    info!(
        "Starting scan with {} workers at {} req/s",
        config.workers(),
        config.rate_limit()
    );
    let mut results = WorkerPool::new(config.workers()).run(cancel.clone(), targets, client);

    let outcome = sink.drain(&mut results).await;
    if outcome.is_err() {
        cancel.cancel();
        // let in-flight workers hand back what they hold so they can exit
        while results.recv().await.is_some() {}
    }

    let state = sink.finish();
    println!("{}\n", state.to_string().green().bold());
    debug!("{} failed, {} invalid", state.failed(), state.invalid());

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e.to_string().red().bold());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Cancels the scan on SIGINT or SIGTERM.
async fn terminate(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Termination requested, stopping workers");
    cancel.cancel();
}

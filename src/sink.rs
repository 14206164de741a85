// File: sink.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{ErrorKind, ProbeError};
use crate::getstate::GetState;
use crate::storage::OutputFile;
use crate::worker::ScanResult;
use chrono::Utc;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    pub debug: bool,
    pub output: Option<PathBuf>,
    pub progress: bool,
}

#[derive(Debug)]
pub enum SinkError {
    Persistence(anyhow::Error),
    ResourceExhausted(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistence(e) => write!(f, "Failed to save result: {:#}", e),
            Self::ResourceExhausted(msg) => write!(
                f,
                "{}, you need to increase ulimit for open files or decrease number of workers",
                msg
            ),
        }
    }
}

impl std::error::Error for SinkError {}

/// Consumes the result stream: prints findings, keeps totals and writes
/// vulnerable URLs to the output file.
pub struct ResultSink {
    state: GetState,
    output: Option<OutputFile>,
    progress: Option<ProgressBar>,
    debug: bool,
}

impl ResultSink {
    pub fn new(options: SinkOptions) -> Result<Self, SinkError> {
        let output = options
            .output
            .as_deref()
            .map(OutputFile::create)
            .transpose()
            .map_err(SinkError::Persistence)?;

        let progress = options.progress.then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        Ok(ResultSink {
            state: GetState::new(),
            output,
            progress,
            debug: options.debug,
        })
    }

    pub fn state(&self) -> &GetState {
        &self.state
    }

    /// Accounts for one result. Errors returned here end the run.
    pub fn handle(&mut self, result: ScanResult) -> Result<(), SinkError> {
        self.state.add_scanned();

        if self.debug {
            if let Some(trace) = &result.debug {
                self.emit(trace.to_string().normal(), result.error().is_some());
            }
        }

        match &result.outcome {
            Err(e) => self.handle_error(&result, e)?,
            Ok(outcome) if outcome.vulnerable => {
                self.state.add_vulnerable();
                let url = result.display_target();
                self.emit(
                    format!("Target: {} is vulnerable.", url).green().bold(),
                    false,
                );
                if let Some(output) = self.output.as_mut() {
                    output.append(url).map_err(SinkError::Persistence)?;
                }
            }
            Ok(outcome) => {
                debug!(
                    "{} is not vulnerable (status {})",
                    result.display_target(),
                    outcome.status
                );
            }
        }

        self.refresh_progress();
        Ok(())
    }

    fn handle_error(&mut self, result: &ScanResult, error: &ProbeError) -> Result<(), SinkError> {
        match error.kind() {
            ErrorKind::InvalidTarget => {
                self.state.add_invalid();
                self.emit(format!("Target Error: {}", error).red().bold(), true);
            }
            ErrorKind::ResourceExhausted => {
                self.state.add_failure();
                let msg = format!("Request Error: {}", error);
                self.emit(msg.red().bold(), true);
                return Err(SinkError::ResourceExhausted(msg));
            }
            ErrorKind::Cancelled => {
                self.state.add_failure();
                debug!("{} cancelled", result.display_target());
            }
            ErrorKind::Transport | ErrorKind::Timeout => {
                self.state.add_failure();
                self.emit(
                    format!("Request Error: {} ({})", error, result.display_target())
                        .red()
                        .bold(),
                    true,
                );
            }
        }
        Ok(())
    }

    /// Reads results until the stream closes or a fatal error occurs.
    pub async fn drain(&mut self, results: &mut mpsc::Receiver<ScanResult>) -> Result<(), SinkError> {
        while let Some(result) = results.recv().await {
            self.handle(result)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> GetState {
        self.state.set_end_time(Utc::now());
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
        if let Some(output) = &self.output {
            info!(
                "Saved {} vulnerable target(s) to {}",
                output.written(),
                output.path().display()
            );
        }
        self.state
    }

    fn refresh_progress(&self) {
        if let Some(pb) = &self.progress {
            pb.set_message(self.state.to_string());
        }
    }

    fn emit(&self, line: ColoredString, to_stderr: bool) {
        match (&self.progress, to_stderr) {
            (Some(pb), _) => pb.println(line.to_string()),
            (None, true) => eprintln!("{}", line),
            (None, false) => println!("{}", line),
        }
    }
}

// File: loader.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::target::{Target, TargetError};
use log::{debug, warn};
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where targets come from. A single URL is emitted before any list entries.
#[derive(Debug, Clone, Default)]
pub struct TargetSource {
    pub single: Option<String>,
    pub file: Option<PathBuf>,
    pub stdin: bool,
}

#[derive(Debug)]
pub enum LoadError {
    NoTargets,
    Open { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargets => write!(f, "You need to specify a target"),
            Self::Open { path, source } => {
                write!(f, "opening targets file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoTargets => None,
            Self::Open { source, .. } => Some(source),
        }
    }
}

/// Starts streaming targets on a one-slot channel.
///
/// The file is opened up front so a bad path fails before scanning starts.
/// Lines are parsed lazily as workers pull them.
pub async fn load_targets(
    source: TargetSource,
    suffix: &str,
    cancel: CancellationToken,
) -> Result<mpsc::Receiver<Target>, LoadError> {
    if source.single.is_none() && source.file.is_none() && !source.stdin {
        return Err(LoadError::NoTargets);
    }

    let file = match &source.file {
        Some(path) => Some(
            tokio::fs::File::open(path)
                .await
                .map_err(|e| LoadError::Open {
                    path: path.clone(),
                    source: e,
                })?,
        ),
        None => None,
    };

    let (tx, rx) = mpsc::channel(1);
    let suffix = suffix.to_string();

    tokio::spawn(async move {
        if let Some(raw) = &source.single {
            if !emit(&tx, &cancel, Target::parse(raw, &suffix)).await {
                return;
            }
        }

        if let Some(file) = file {
            stream_lines(BufReader::new(file), &suffix, &tx, &cancel).await;
        } else if source.stdin {
            stream_lines(BufReader::new(tokio::io::stdin()), &suffix, &tx, &cancel).await;
        }
        debug!("Target source exhausted");
    });

    Ok(rx)
}

/// Feeds every non-blank, non-comment line of `reader` into `tx`.
pub async fn stream_lines<R>(
    reader: R,
    suffix: &str,
    tx: &mpsc::Sender<Target>,
    cancel: &CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        let target = match line {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                Target::parse(trimmed, suffix)
            }
            Ok(None) => return,
            // the undecodable line is already consumed, the next read starts after it
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping undecodable target line: {}", e);
                Target::invalid("", TargetError::Read(e.to_string()))
            }
            Err(e) => {
                warn!("Reading targets failed: {}", e);
                let _ = emit(tx, cancel, Target::invalid("", TargetError::Read(e.to_string()))).await;
                return;
            }
        };

        if !emit(tx, cancel, target).await {
            return;
        }
    }
}

async fn emit(tx: &mpsc::Sender<Target>, cancel: &CancellationToken, target: Target) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(target) => sent.is_ok(),
    }
}

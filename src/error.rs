// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::target::TargetError;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

// EMFILE / ENFILE on Linux and the BSDs.
const TOO_MANY_OPEN_FILES: [i32; 2] = [24, 23];

/// How a failed probe should be treated by whoever consumes the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidTarget,
    Transport,
    Timeout,
    Cancelled,
    ResourceExhausted,
}

#[derive(Debug)]
pub enum ProbeError {
    InvalidTarget(TargetError),
    Client(reqwest::Error),
    Transport(reqwest::Error),
    Timeout(Duration),
    Cancelled,
    ResourceExhausted(String),
}

impl ProbeError {
    /// Sorts a reqwest failure into timeout, descriptor exhaustion or plain
    /// transport error.
    pub fn from_request(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if is_resource_exhaustion(&error) {
            Self::ResourceExhausted(error_chain(&error))
        } else {
            Self::Transport(error)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Self::Client(_) | Self::Transport(_) => ErrorKind::Transport,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(e) => write!(f, "Invalid target: {}", e),
            Self::Client(e) => write!(f, "Building http client failed: {}", e),
            Self::Transport(e) => write!(f, "Sending request failed: {}", error_chain(e)),
            Self::Timeout(d) => write!(f, "Request timed out after {:?}: deadline exceeded", d),
            Self::Cancelled => write!(f, "Request cancelled"),
            Self::ResourceExhausted(msg) => write!(f, "Too many open files: {}", msg),
        }
    }
}

impl StdError for ProbeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::InvalidTarget(e) => Some(e),
            Self::Client(e) | Self::Transport(e) => Some(e),
            Self::Timeout(_) | Self::Cancelled | Self::ResourceExhausted(_) => None,
        }
    }
}

impl From<TargetError> for ProbeError {
    fn from(error: TargetError) -> Self {
        Self::InvalidTarget(error)
    }
}

/// Walks the source chain looking for an exhausted descriptor table.
pub fn is_resource_exhaustion(error: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io
                .raw_os_error()
                .is_some_and(|code| TOO_MANY_OPEN_FILES.contains(&code))
            {
                return true;
            }
        }
        if err.to_string().to_lowercase().contains("too many open files") {
            return true;
        }
        current = err.source();
    }
    false
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut out = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        let msg = err.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        current = err.source();
    }
    out
}

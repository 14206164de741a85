// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::target::DEFAULT_PATH_SUFFIX;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT: u32 = 500;
pub const DEFAULT_WORKERS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroRateLimit,
    ZeroWorkers,
    ZeroTimeout,
    InvalidPathSuffix(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRateLimit => write!(f, "rate limit must be at least one request per second"),
            Self::ZeroWorkers => write!(f, "at least one worker is required"),
            Self::ZeroTimeout => write!(f, "request timeout must be greater than zero"),
            Self::InvalidPathSuffix(p) => write!(f, "path suffix {} must start with '/'", p),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct ConfigParameter {
    timeout: Duration,
    rate_limit: NonZeroU32,
    workers: usize,
    path_suffix: String,
    debug: bool,
    output: Option<PathBuf>,
}

impl Default for ConfigParameter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParameter {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            rate_limit: NonZeroU32::new(DEFAULT_RATE_LIMIT).unwrap_or(NonZeroU32::MIN),
            workers: DEFAULT_WORKERS,
            path_suffix: DEFAULT_PATH_SUFFIX.to_string(),
            debug: false,
            output: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_rate_limit(&mut self, rate_limit: u32) -> Result<(), ConfigError> {
        self.rate_limit = NonZeroU32::new(rate_limit).ok_or(ConfigError::ZeroRateLimit)?;
        Ok(())
    }

    pub fn rate_limit(&self) -> NonZeroU32 {
        self.rate_limit
    }

    pub fn set_workers(&mut self, workers: usize) -> Result<(), ConfigError> {
        if workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        self.workers = workers;
        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn set_path_suffix(&mut self, suffix: &str) -> Result<(), ConfigError> {
        if !suffix.starts_with('/') {
            return Err(ConfigError::InvalidPathSuffix(suffix.to_string()));
        }
        self.path_suffix = suffix.to_string();
        Ok(())
    }

    pub fn path_suffix(&self) -> &str {
        &self.path_suffix
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_output(&mut self, output: Option<PathBuf>) {
        self.output = output;
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

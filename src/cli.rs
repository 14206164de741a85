// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::{ConfigError, ConfigParameter};
use crate::loader::TargetSource;
use crate::target::DEFAULT_PATH_SUFFIX;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    after_help = "Examples:\n  gitprobe -u example.com\n  gitprobe -i urls.txt -w 100 -t 30 -o out.txt\n  cat urls.txt | gitprobe"
)]
pub struct Cli {
    #[arg(short = 'u', long = "url", help = "Check a single url")]
    pub url: Option<String>,

    #[arg(
        short = 'i',
        long = "urls",
        help = "File containing multiple urls (one per line)"
    )]
    pub input_file: Option<PathBuf>,

    #[arg(
        short = 'r',
        long = "rate-limit",
        default_value_t = 500,
        help = "Requests per second limit across all workers"
    )]
    pub rate_limit: u32,

    #[arg(
        short = 'w',
        long = "workers",
        default_value_t = 50,
        help = "Number of concurrent http workers"
    )]
    pub workers: usize,

    #[arg(long = "threads", help = "Runtime worker threads (default: CPUs - 1)")]
    pub threads: Option<usize>,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 30,
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(long = "path", default_value = DEFAULT_PATH_SUFFIX, help = "Path appended to every target")]
    pub path: String,

    #[arg(short = 'o', long = "output", help = "Save vulnerable targets in a file")]
    pub output: Option<PathBuf>,

    #[arg(short = 'd', long = "debug", help = "Print connection timing per request")]
    pub debug: bool,

    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,

    #[arg(long = "no-color", help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long = "no-progress", help = "Hide the progress spinner")]
    pub no_progress: bool,
}

impl Cli {
    pub fn config(&self) -> Result<ConfigParameter, ConfigError> {
        let mut config = ConfigParameter::new();
        config.set_timeout(Duration::from_secs(self.timeout))?;
        config.set_rate_limit(self.rate_limit)?;
        config.set_workers(self.workers)?;
        config.set_path_suffix(&self.path)?;
        config.set_debug(self.debug);
        config.set_output(self.output.clone());
        Ok(config)
    }

    /// Targets from flags; stdin is read only when it is piped and no flag was given.
    pub fn target_source(&self) -> TargetSource {
        let stdin = self.url.is_none()
            && self.input_file.is_none()
            && !std::io::stdin().is_terminal();
        TargetSource {
            single: self.url.clone(),
            file: self.input_file.clone(),
            stdin,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
        })
        .max(1)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Warn)
    }
}

// File: storage.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Newline-delimited list of vulnerable targets.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    file: File,
    written: u64,
}

impl OutputFile {
    /// Opens `path` for writing and drops whatever a previous run left in it.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("opening file {}", path.display()))?;

        Ok(OutputFile {
            path: path.to_path_buf(),
            file,
            written: 0,
        })
    }

    pub fn append(&mut self, url: &str) -> Result<()> {
        writeln!(self.file, "{}", url)
            .and_then(|_| self.file.flush())
            .with_context(|| format!("saving {} to {}", url, self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_truncates_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let output = OutputFile::create(&path).unwrap();
        assert_eq!(output.written(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_append_writes_one_url_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");

        let mut output = OutputFile::create(&path).unwrap();
        output.append("https://a.example/.git/config").unwrap();
        output.append("https://b.example/.git/config").unwrap();

        assert_eq!(output.written(), 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://a.example/.git/config\nhttps://b.example/.git/config\n"
        );
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = OutputFile::create(&path).unwrap_err();
        assert!(err.to_string().contains("opening file"));
    }
}

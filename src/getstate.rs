/*
Copyright 2022 Volker Schwaberow <volker@schwaberow.de>
Permission is hereby granted, free of charge, to any person obtaining a
copy of this software and associated documentation files (the
"Software"), to deal in the Software without restriction, including without
limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the
Software is furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be
included in all copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR
OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE,
ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
DEALINGS IN THE SOFTWARE.
Author(s): Volker Schwaberow
*/

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Running totals for one scan. Owned by the single result consumer, so plain
/// integers are enough.
#[derive(Debug, Clone, Copy)]
pub struct GetState {
    scanned: u64,
    vulnerable: u64,
    failed: u64,
    invalid: u64,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl GetState {
    pub fn new() -> GetState {
        GetState {
            scanned: 0,
            vulnerable: 0,
            failed: 0,
            invalid: 0,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn add_scanned(&mut self) {
        self.scanned += 1;
    }

    pub fn add_vulnerable(&mut self) {
        self.vulnerable += 1;
    }

    pub fn add_failure(&mut self) {
        self.failed += 1;
    }

    pub fn add_invalid(&mut self) {
        self.invalid += 1;
    }

    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    pub fn vulnerable(&self) -> u64 {
        self.vulnerable
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn invalid(&self) -> u64 {
        self.invalid
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn set_end_time(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn elapsed(&self) -> Duration {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).to_std().unwrap_or_default()
    }
}

impl Default for GetState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scanned: {} target(s) in {:.2?} found: {} vulnerable",
            self.scanned,
            self.elapsed(),
            self.vulnerable
        )
    }
}

// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod cli;
pub mod config;
pub mod error;
pub mod getstate;
pub mod http;
pub mod loader;
pub mod sink;
pub mod storage;
pub mod target;
pub mod trace;
pub mod worker;

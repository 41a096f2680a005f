// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI module for cwc
//!
//! Argument parsing, terminal output and the chat drivers used by the binary.

pub mod args;
pub mod printer;
pub mod run;

pub use args::*;
pub use printer::ChunkPrinter;
pub use run::{run_interactive, run_non_interactive, system_message, EXIT_COMMAND};

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! cwc - chat with a language model about your code.
//!
//! This crate exposes the conversation engine used by the `cwc` CLI
//! (`src/main.rs`).
//!
//! Architecture highlights:
//! - `chat`: conversation sessions, turn worker and presentation chunks
//! - `llm`: backend abstraction, OpenAI-compatible streaming provider, mock
//! - `tools`: tool call assembly, registry, dispatch and executors
//! - `config`: settings file and validation
//! - `cli`: argument parsing and terminal drivers

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{CwcError, Result};

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation engine
//!
//! Streams model output to an observer, rebuilds tool calls from the
//! stream, runs them and resumes the exchange until the model answers with
//! plain text.

pub mod chunk;
mod session;
mod turn;

pub use chunk::{ConversationChunk, ConversationObserver, ERROR_PREFIX};
pub use session::{Chat, Conversation, DEFAULT_MAX_TOOL_ROUNDS};
pub use turn::TurnState;

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Presentation chunks
//!
//! A turn reaches the caller as a sequence of [`ConversationChunk`]s: one
//! `is_initial` chunk, any number of content chunks, and one chunk that is
//! `is_final` (and `is_error` when the turn failed). A tool cycle that
//! produced text closes its segment before the follow-up request opens a
//! new one.

use std::sync::Arc;

use crate::error::CwcError;
use crate::llm::message::Role;
use crate::tools::assembler::ToolCallRequest;

/// Prefix of the content carried by error chunks
pub const ERROR_PREFIX: &str = "Sorry, I'm having trouble processing your request";

/// One presentation unit delivered to the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationChunk {
    pub role: Role,
    pub content: String,
    pub is_initial: bool,
    pub is_final: bool,
    pub is_error: bool,
}

impl ConversationChunk {
    fn new(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_initial: false,
            is_final: false,
            is_error: false,
        }
    }

    pub fn initial() -> Self {
        Self {
            is_initial: true,
            ..Self::new("")
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self::new(text)
    }

    pub fn final_chunk() -> Self {
        Self {
            is_final: true,
            ..Self::new("")
        }
    }

    pub fn error(err: &CwcError) -> Self {
        Self {
            is_final: true,
            is_error: true,
            ..Self::new(format!("{}: {}", ERROR_PREFIX, err))
        }
    }

    /// Whether this chunk ends a segment
    pub fn is_terminal(&self) -> bool {
        self.is_final || self.is_error
    }
}

/// Receives a conversation's output.
///
/// Called synchronously from the turn worker; implementations must return
/// promptly or the turn stalls.
pub trait ConversationObserver: Send + Sync {
    fn on_chunk(&self, chunk: ConversationChunk);

    /// A tool is about to run
    fn on_tool_invocation(&self, _request: &ToolCallRequest) {}

    /// A tool could not be found or failed; the turn continues
    fn on_tool_warning(&self, _tool: &str, _message: &str) {}
}

impl<F> ConversationObserver for F
where
    F: Fn(ConversationChunk) + Send + Sync,
{
    fn on_chunk(&self, chunk: ConversationChunk) {
        self(chunk)
    }
}

/// Emits the chunk segments of one turn
pub(crate) struct ChunkEmitter {
    observer: Arc<dyn ConversationObserver>,
    open: bool,
}

impl ChunkEmitter {
    pub(crate) fn new(observer: Arc<dyn ConversationObserver>) -> Self {
        Self {
            observer,
            open: false,
        }
    }

    fn open_segment(&mut self) {
        if !self.open {
            self.observer.on_chunk(ConversationChunk::initial());
            self.open = true;
        }
    }

    /// Forward a piece of visible text, opening a segment if needed
    pub(crate) fn content(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.open_segment();
        self.observer.on_chunk(ConversationChunk::content(text));
    }

    /// End the turn normally; a turn without text still gets a segment
    pub(crate) fn finish(&mut self) {
        self.open_segment();
        self.observer.on_chunk(ConversationChunk::final_chunk());
        self.open = false;
    }

    /// Close the segment of a tool cycle if it showed any text
    pub(crate) fn close_segment(&mut self) {
        if self.open {
            self.observer.on_chunk(ConversationChunk::final_chunk());
            self.open = false;
        }
    }

    /// End the turn with an error
    pub(crate) fn error(&mut self, err: &CwcError) {
        self.open_segment();
        self.observer.on_chunk(ConversationChunk::error(err));
        self.open = false;
    }

    pub(crate) fn observer(&self) -> &Arc<dyn ConversationObserver> {
        &self.observer
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool call assembly
//!
//! Tool invocation requests arrive split across many stream fragments, and
//! several calls may be in flight at once with their fragments interleaved.
//! The assembler keeps one builder per call, keyed by the call's stream
//! index, and only hands out finished requests once the backend reports
//! that it stopped generating in order to call tools.

use std::collections::HashMap;

use crate::llm::message::ToolCall;
use crate::llm::provider::{FinishReason, ResponseFragment, ToolCallFragment};

/// A fully assembled tool invocation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Stream index of the call
    pub index: usize,
    /// Call identifier (never empty once detected)
    pub id: String,
    /// Tool name
    pub name: String,
    /// JSON argument text, validated only at execution time
    pub args: String,
}

impl From<ToolCallRequest> for ToolCall {
    fn from(request: ToolCallRequest) -> Self {
        ToolCall {
            id: request.id,
            name: request.name,
            arguments: request.args,
        }
    }
}

/// Accumulates tool call fragments from one request cycle
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    /// Builders in the order their calls were opened
    calls: Vec<ToolCallRequest>,
    /// Most recently opened builder per stream index
    open: HashMap<usize, usize>,
    /// Whether the terminal fragment asked for tool calls
    ready: bool,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment from the stream.
    pub fn collect(&mut self, fragment: &ResponseFragment) {
        if let Some(piece) = &fragment.tool_call {
            self.collect_piece(piece);
        }

        if fragment.finish_reason == Some(FinishReason::ToolCalls) {
            self.ready = true;
        }
    }

    fn collect_piece(&mut self, piece: &ToolCallFragment) {
        match self.open.get(&piece.index).copied() {
            Some(pos) if piece.id.is_empty() || self.calls[pos].id == piece.id => {
                self.append(pos, piece);
            }
            // An anonymous call learns its id from the first fragment that names one
            Some(pos) if self.calls[pos].id.is_empty() => {
                self.calls[pos].id = piece.id.clone();
                self.append(pos, piece);
            }
            _ => {
                self.calls.push(ToolCallRequest {
                    index: piece.index,
                    id: piece.id.clone(),
                    name: String::new(),
                    args: String::new(),
                });
                let pos = self.calls.len() - 1;
                self.open.insert(piece.index, pos);
                self.append(pos, piece);
            }
        }
    }

    fn append(&mut self, pos: usize, piece: &ToolCallFragment) {
        let call = &mut self.calls[pos];
        call.name.push_str(&piece.name_delta);
        call.args.push_str(&piece.args_delta);
    }

    /// True once a terminal fragment with `finish_reason = tool_calls` was seen
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether any call fragments have been collected
    pub fn has_fragments(&self) -> bool {
        !self.calls.is_empty()
    }

    /// The assembled requests in first-seen order; empty until ready.
    pub fn detected_calls(&self) -> Vec<ToolCallRequest> {
        if !self.ready {
            return Vec::new();
        }

        self.calls
            .iter()
            .map(|call| {
                let mut call = call.clone();
                if call.id.is_empty() {
                    call.id = format!("call_{}", call.index);
                }
                call
            })
            .collect()
    }

    /// Reset all state so the assembler can serve the next cycle
    pub fn flush(&mut self) {
        self.calls.clear();
        self.open.clear();
        self.ready = false;
    }
}

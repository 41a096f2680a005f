// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM Provider trait and related types
//!
//! Defines the narrow contract the conversation engine needs from a model
//! backend: send the history plus tool definitions, get back an ordered
//! stream of response fragments.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::llm::message::{Message, Role};

/// Ordered fragments of one streamed model response
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<ResponseFragment>> + Send>>;

/// Main trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Open a streaming completion for the given history and tools.
    ///
    /// Errors returned here mean the stream could not be opened; errors
    /// yielded by the stream mean it failed mid-read.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<FragmentStream>;
}

/// Request for a streamed completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full conversation history, system message first
    pub messages: Vec<Message>,

    /// Tools available for the model to use
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: vec![],
        }
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of message
    Stop,
    /// Hit the token limit
    Length,
    /// Wants to invoke tools
    ToolCalls,
}

impl FinishReason {
    /// Parse the wire value used by OpenAI-compatible backends.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "stop" => Some(FinishReason::Stop),
            "length" => Some(FinishReason::Length),
            "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
            "" => None,
            _ => Some(FinishReason::Stop),
        }
    }
}

/// One piece of a tool invocation request as it arrives on the stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    /// Position of the call within the response
    pub index: usize,
    /// Call id; non-empty only on the fragment that opens the call
    pub id: String,
    /// Piece of the tool name
    pub name_delta: String,
    /// Piece of the JSON argument text
    pub args_delta: String,
}

/// One unit from the backend stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseFragment {
    /// Role announced by the backend, usually only on the first fragment
    pub role: Option<Role>,
    /// Piece of user-visible text
    pub content_delta: String,
    /// Piece of a tool invocation request
    pub tool_call: Option<ToolCallFragment>,
    /// Set on the terminal fragment
    pub finish_reason: Option<FinishReason>,
}

impl ResponseFragment {
    /// A fragment carrying only text
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content_delta: text.into(),
            ..Default::default()
        }
    }

    /// A fragment carrying a piece of a tool call
    pub fn tool_call(
        index: usize,
        id: impl Into<String>,
        name_delta: impl Into<String>,
        args_delta: impl Into<String>,
    ) -> Self {
        Self {
            tool_call: Some(ToolCallFragment {
                index,
                id: id.into(),
                name_delta: name_delta.into(),
                args_delta: args_delta.into(),
            }),
            ..Default::default()
        }
    }

    /// A terminal fragment
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Set the announced role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Whether this fragment ends the stream's generation
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Tool definition for the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Input schema (JSON Schema)
    pub input_schema: ToolInputSchema,
}

/// Input schema for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions
    pub properties: serde_json::Value,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for cwc
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for cwc operations
#[derive(Error, Debug)]
pub enum CwcError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A tool ran but failed (spawn failure, non-zero exit, timeout)
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// Tool arguments were not a flat JSON object
    #[error("Invalid tool arguments: {0}")]
    ToolArguments(String),

    /// A command template could not be parsed or rendered
    #[error("Template error: {0}")]
    Template(String),

    /// A configured tool is malformed
    #[error("Invalid tool spec: {0}")]
    InvalidToolSpec(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// All problems found while validating settings
    #[error("config validation failed: {}", .0.join(", "))]
    ConfigValidation(Vec<String>),

    /// The model kept requesting tools past the per-turn limit
    #[error("too many tool rounds in one turn (limit {0})")]
    ToolRoundLimit(usize),

    /// A turn is still running on this conversation
    #[error("a turn is already pending on this conversation")]
    TurnPending,

    /// Non-interactive mode was started without a prompt
    #[error("non-interactive mode requires a prompt")]
    NoPrompt,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Requested model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for cwc operations
pub type Result<T> = std::result::Result<T, CwcError>;

impl CwcError {
    /// Whether the error came from talking to the model backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, CwcError::Api(_) | CwcError::Http(_))
    }

    /// Whether a turn ending with this error keeps the messages it appended.
    ///
    /// Only the round limit does: its rounds completed normally. Any other
    /// error means the exchange failed and is removed from history.
    pub fn keeps_turn_history(&self) -> bool {
        matches!(self, CwcError::ToolRoundLimit(_))
    }

    /// Whether the error came from running a tool.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            CwcError::ToolExecution(_) | CwcError::ToolArguments(_) | CwcError::Template(_)
        )
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for cwc
//!
//! Handles loading and saving settings from ~/.cwc/settings.json

use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_MAX_TOOL_ROUNDS;

mod io;
mod validation;

/// Main settings structure, stored in ~/.cwc/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Model backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Tools enabled by default
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub session: SessionConfig,
}

/// OpenAI-compatible backend configuration.
///
/// The API key itself is never stored; it is read from `api_key_env`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the API, without `/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model (or Azure deployment) name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Azure API version; switches to Azure-style authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolsConfig {
    /// Tool ids enabled when none are given on the command line
    #[serde(default)]
    pub enabled: Vec<String>,

    /// Kill shell tools running longer than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Tool rounds allowed before a turn is aborted
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tool_rounds() -> usize {
    DEFAULT_MAX_TOOL_ROUNDS
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;

/// cwc - chat with a language model about your code
#[derive(Parser, Debug)]
#[command(name = "cwc")]
#[command(version, about = "Chat with a language model about your code")]
pub struct Cli {
    /// Prompt to start the conversation with (required when stdin is piped)
    pub prompt: Option<String>,

    /// Enable a tool by id (repeatable)
    #[arg(short = 't', long = "tool")]
    pub tools: Vec<String>,

    /// Replace the default system message
    #[arg(long)]
    pub system: Option<String>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key; takes precedence over the configured environment variable
    #[arg(long)]
    pub api_key: Option<String>,

    /// Settings file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.provider.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            settings.provider.base_url = base_url.clone();
        }
    }

    /// Key given with `--api-key`, else the one from the settings' env var
    pub fn api_key(&self, settings: &Settings) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| settings.api_key())
    }

    /// Tools given with `--tool`, or the configured defaults when none are
    pub fn enabled_tools(&self, settings: &Settings) -> Vec<String> {
        if self.tools.is_empty() {
            settings.tools.enabled.clone()
        } else {
            self.tools.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_and_tools() {
        let cli = Cli::try_parse_from(["cwc", "-t", "diff", "--tool", "log", "what changed?"]).unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("what changed?"));
        assert_eq!(cli.tools, vec!["diff".to_string(), "log".to_string()]);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_no_arguments() {
        let cli = Cli::try_parse_from(["cwc"]).unwrap();
        assert!(cli.prompt.is_none());
        assert!(cli.tools.is_empty());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["cwc", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_rejects_two_prompts() {
        assert!(Cli::try_parse_from(["cwc", "one", "two"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from([
            "cwc",
            "--model",
            "gpt-4o",
            "--base-url",
            "http://localhost:8080/v1",
        ])
        .unwrap();
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.provider.model, "gpt-4o");
        assert_eq!(settings.provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_enabled_tools_fallback() {
        let mut settings = Settings::default();
        settings.tools.enabled = vec!["diff".to_string()];

        let cli = Cli::try_parse_from(["cwc"]).unwrap();
        assert_eq!(cli.enabled_tools(&settings), vec!["diff".to_string()]);

        let cli = Cli::try_parse_from(["cwc", "-t", "log"]).unwrap();
        assert_eq!(cli.enabled_tools(&settings), vec!["log".to_string()]);
    }

    #[test]
    fn test_api_key_flag_wins_over_env() {
        let mut settings = Settings::default();
        settings.provider.api_key_env = "CWC_TEST_CLI_KEY_7731".to_string();
        std::env::set_var("CWC_TEST_CLI_KEY_7731", "sk-env");

        let cli = Cli::try_parse_from(["cwc", "--api-key", "sk-flag"]).unwrap();
        assert_eq!(cli.api_key(&settings).as_deref(), Some("sk-flag"));

        let cli = Cli::try_parse_from(["cwc", "--api-key", "  "]).unwrap();
        assert_eq!(cli.api_key(&settings).as_deref(), Some("sk-env"));

        let cli = Cli::try_parse_from(["cwc"]).unwrap();
        assert_eq!(cli.api_key(&settings).as_deref(), Some("sk-env"));

        std::env::remove_var("CWC_TEST_CLI_KEY_7731");
        assert_eq!(cli.api_key(&settings), None);
    }
}

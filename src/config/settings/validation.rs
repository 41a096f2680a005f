// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use crate::error::{CwcError, Result};

use super::Settings;

impl Settings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.provider.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Shell tool timeout, if configured
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tools.timeout_secs.map(Duration::from_secs)
    }

    /// Check everything needed to talk to the backend, reporting all
    /// problems at once.
    pub fn validate(&self, api_key: Option<&str>) -> Result<()> {
        let mut problems = Vec::new();

        if api_key.map_or(true, |key| key.trim().is_empty()) {
            problems.push(format!(
                "api key must be provided and not be empty (set ${} or pass --api-key)",
                self.provider.api_key_env
            ));
        }

        if self.provider.base_url.trim().is_empty() {
            problems.push("endpoint must be provided and not be empty".to_string());
        }

        if self.provider.model.trim().is_empty() {
            problems.push("model must be provided and not be empty".to_string());
        }

        if matches!(&self.provider.api_version, Some(v) if v.trim().is_empty()) {
            problems.push("api version must not be empty when set".to_string());
        }

        if self.session.max_tool_rounds == 0 {
            problems.push("max tool rounds must be at least 1".to_string());
        }

        if self.tools.timeout_secs == Some(0) {
            problems.push("tool timeout must be at least 1 second when set".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CwcError::ConfigValidation(problems))
        }
    }
}

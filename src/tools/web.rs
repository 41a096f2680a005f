// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Web executor
//!
//! Tools may declare endpoint templates, but calling them is not supported
//! yet. Execution answers with a fixed placeholder so the model still gets a
//! tool response.

use crate::error::Result;
use crate::tools::template::TemplateArgs;

/// Text returned for every web tool invocation
pub const WEB_PLACEHOLDER: &str = "Web tools are not yet supported";

#[derive(Debug, Clone, Default)]
pub struct WebExecutor {
    endpoints: Vec<String>,
}

impl WebExecutor {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub async fn execute(&self, _args: &TemplateArgs) -> Result<String> {
        tracing::debug!(
            target: "cwc.tools.dispatcher",
            endpoints = self.endpoints.len(),
            "web tool invoked, returning placeholder"
        );
        Ok(WEB_PLACEHOLDER.to_string())
    }
}

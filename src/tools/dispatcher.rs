// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool dispatch
//!
//! Matches an assembled request against the tools resolved for the session
//! and turns the execution result into a tool-role message.

use std::collections::HashMap;

use crate::error::Result;
use crate::llm::message::Message;
use crate::llm::provider::ToolDefinition;
use crate::tools::assembler::ToolCallRequest;
use crate::tools::registry::{Tool, ToolRegistry};

/// Result of dispatching one request
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The tool ran; the message answers the request's call id
    Executed(Message),
    /// No registered tool has the requested name
    NotFound,
}

/// Executes assembled tool calls against a fixed tool set
#[derive(Debug, Clone, Default)]
pub struct ToolDispatcher {
    tools: HashMap<String, Tool>,
    definitions: Vec<ToolDefinition>,
}

impl ToolDispatcher {
    /// Snapshot the registry's enabled tools.
    pub fn new(registry: &dyn ToolRegistry) -> Self {
        let enabled = registry.list_enabled_tools();
        let definitions = enabled.iter().map(|t| t.definition().clone()).collect();
        let tools = enabled
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();
        Self { tools, definitions }
    }

    /// Definitions to advertise to the model, in registry order
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the tool named by `request`.
    ///
    /// Argument, template and process failures are returned as errors; an
    /// unknown name is not an error.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> Result<DispatchOutcome> {
        let Some(tool) = self.tools.get(&request.name) else {
            tracing::debug!(target: "cwc.tools.dispatcher", tool = %request.name, "no such tool");
            return Ok(DispatchOutcome::NotFound);
        };

        tracing::debug!(
            target: "cwc.tools.dispatcher",
            tool = %request.name,
            call_id = %request.id,
            "executing tool"
        );

        let output = tool.execute(&request.args).await?;

        tracing::debug!(
            target: "cwc.tools.dispatcher",
            tool = %request.name,
            bytes = output.len(),
            "tool finished"
        );

        Ok(DispatchOutcome::Executed(Message::tool(
            request.id.clone(),
            output,
        )))
    }
}

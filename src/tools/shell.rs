// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Shell command executor
//!
//! Renders each command template of a tool and runs it through `sh -c`,
//! capturing standard output.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{CwcError, Result};
use crate::tools::template::{self, TemplateArgs};

/// Runs a tool's command templates as shell scripts
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    commands: Vec<String>,
    timeout: Option<Duration>,
}

impl ShellExecutor {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            timeout: None,
        }
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Render and run every command in order, joining their outputs with newlines.
    ///
    /// The first failure aborts the remaining commands.
    pub async fn execute(&self, args: &TemplateArgs) -> Result<String> {
        let mut results = Vec::with_capacity(self.commands.len());

        for command in &self.commands {
            let script = template::render(command, args)?;
            results.push(self.run(&script).await?);
        }

        Ok(results.join("\n"))
    }

    async fn run(&self, script: &str) -> Result<String> {
        tracing::debug!(target: "cwc.tools.shell", script = %script, "running shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CwcError::ToolExecution(format!("failed to spawn command: {}", e)))?;

        let output = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    CwcError::ToolExecution(format!(
                        "command timed out after {} seconds",
                        limit.as_secs_f64()
                    ))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| CwcError::ToolExecution(format!("failed to run command: {}", e)))?;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(target: "cwc.tools.shell", code = %code, "shell command failed");
            return Err(CwcError::ToolExecution(format!(
                "error executing shell script (exit status {}): {}",
                code,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool registry
//!
//! Tools are resolved by id through a [`ToolLocator`] once, when a toolkit is
//! built, and the resulting set is handed to a chat session. Locators read
//! YAML tool files or provide built-in tools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{CwcError, Result};
use crate::llm::provider::ToolDefinition;
use crate::tools::definition::{ParameterType, SchemaBuilder};
use crate::tools::shell::ShellExecutor;
use crate::tools::template;
use crate::tools::web::WebExecutor;

/// How a tool runs
#[derive(Debug, Clone)]
pub enum Executor {
    Shell(ShellExecutor),
    Web(WebExecutor),
}

/// A registered tool: the definition advertised to the model plus its executor
#[derive(Debug, Clone)]
pub struct Tool {
    definition: ToolDefinition,
    executor: Executor,
}

impl Tool {
    pub fn new(definition: ToolDefinition, executor: Executor) -> Self {
        Self {
            definition,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Apply a timeout to shell commands; web tools ignore it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.executor = match self.executor {
            Executor::Shell(shell) => Executor::Shell(shell.with_timeout(timeout)),
            web => web,
        };
        self
    }

    /// Run the tool with raw JSON arguments from the model.
    pub async fn execute(&self, arguments: &str) -> Result<String> {
        let args = template::parse_arguments(arguments)?;
        match &self.executor {
            Executor::Shell(shell) => shell.execute(&args).await,
            Executor::Web(web) => web.execute(&args).await,
        }
    }
}

/// Finds tools by id
#[cfg_attr(test, mockall::automock)]
pub trait ToolLocator: Send + Sync {
    fn locate_tool(&self, id: &str) -> Option<Tool>;
}

/// Source of the tools enabled for a session
pub trait ToolRegistry: Send + Sync {
    /// Enabled tools, sorted by name
    fn list_enabled_tools(&self) -> Vec<Tool>;
}

/// A tool as written in `tools.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfiguredTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub shell: Vec<String>,
    #[serde(default)]
    pub web: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ConfiguredToolParameter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfiguredToolParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
}

/// Top level of a `tools.yaml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub tools: Vec<ConfiguredTool>,
}

impl ConfiguredTool {
    /// Validate and convert into a runnable tool.
    pub fn into_tool(self) -> Result<Tool> {
        let mut schema = SchemaBuilder::new();
        for param in &self.parameters {
            let ty: ParameterType = param.param_type.parse().map_err(|_| {
                CwcError::InvalidToolSpec(format!(
                    "tool '{}' parameter '{}' has an invalid data type: {}",
                    self.name, param.name, param.param_type
                ))
            })?;
            schema = schema.property(&param.name, &param.description, ty, param.required);
        }

        let executor = match (self.shell.is_empty(), self.web.is_empty()) {
            (false, true) => Executor::Shell(ShellExecutor::new(self.shell)),
            (true, false) => Executor::Web(WebExecutor::new(self.web)),
            (false, false) => {
                return Err(CwcError::InvalidToolSpec(format!(
                    "tool '{}' declares both shell and web executables",
                    self.name
                )))
            }
            (true, true) => {
                return Err(CwcError::InvalidToolSpec(format!(
                    "tool '{}' has nothing to execute",
                    self.name
                )))
            }
        };

        Ok(Tool::new(
            ToolDefinition {
                name: self.name,
                description: self.description,
                input_schema: schema.build(),
            },
            executor,
        ))
    }
}

/// Looks tools up in YAML files; later paths take precedence
#[derive(Debug, Clone)]
pub struct ConfigFileToolLocator {
    paths: Vec<PathBuf>,
}

impl ConfigFileToolLocator {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Global `tools.yaml` under the cwc home, then `./.cwc/tools.yaml`
    pub fn default_paths() -> Vec<PathBuf> {
        vec![
            Settings::cwc_home().join("tools.yaml"),
            PathBuf::from(".cwc").join("tools.yaml"),
        ]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn read_config(path: &Path) -> Option<ToolConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return None,
        };

        match serde_yaml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(
                    target: "cwc.tools.registry",
                    path = %path.display(),
                    error = %e,
                    "skipping unreadable tool file"
                );
                None
            }
        }
    }
}

impl ToolLocator for ConfigFileToolLocator {
    fn locate_tool(&self, id: &str) -> Option<Tool> {
        for path in self.paths.iter().rev() {
            let Some(config) = Self::read_config(path) else {
                continue;
            };

            for configured in config.tools.into_iter().filter(|t| t.name == id) {
                match configured.into_tool() {
                    Ok(tool) => return Some(tool),
                    Err(e) => {
                        tracing::warn!(
                            target: "cwc.tools.registry",
                            path = %path.display(),
                            error = %e,
                            "skipping invalid tool"
                        );
                    }
                }
            }
        }
        None
    }
}

/// Tools that ship with cwc
#[derive(Debug, Clone, Default)]
pub struct BuiltinToolLocator;

impl BuiltinToolLocator {
    fn diff() -> Tool {
        let schema = SchemaBuilder::new()
            .string(
                "source",
                "The source ref to compare. E.g. 'main', 'HEAD~1', etc.",
                false,
            )
            .string(
                "target",
                "The target ref to compare. E.g. 'main', 'HEAD~1', etc.",
                true,
            )
            .build();

        Tool::new(
            ToolDefinition {
                name: "diff".to_string(),
                description: "Get the git diff between two refs.".to_string(),
                input_schema: schema,
            },
            Executor::Shell(ShellExecutor::new(vec![
                r#"git diff {{or .source ""}} {{.target}}"#.to_string(),
            ])),
        )
    }
}

impl ToolLocator for BuiltinToolLocator {
    fn locate_tool(&self, id: &str) -> Option<Tool> {
        match id {
            "diff" => Some(Self::diff()),
            _ => None,
        }
    }
}

/// Asks each locator in turn; the first hit wins
pub struct MergedToolLocator {
    locators: Vec<Box<dyn ToolLocator>>,
}

impl MergedToolLocator {
    pub fn new(locators: Vec<Box<dyn ToolLocator>>) -> Self {
        Self { locators }
    }
}

impl ToolLocator for MergedToolLocator {
    fn locate_tool(&self, id: &str) -> Option<Tool> {
        self.locators.iter().find_map(|l| l.locate_tool(id))
    }
}

/// The set of tools enabled for a session
#[derive(Debug, Clone, Default)]
pub struct Toolkit {
    tools: BTreeMap<String, Tool>,
}

impl Toolkit {
    /// Resolve `ids` through `locator`, skipping ids that are not found.
    pub fn new(locator: &dyn ToolLocator, ids: &[String]) -> Self {
        let mut toolkit = Self::default();
        for id in ids {
            match locator.locate_tool(id) {
                Some(tool) => toolkit.insert(tool),
                None => {
                    tracing::warn!(target: "cwc.tools.registry", tool = %id, "tool not found, skipping");
                }
            }
        }
        toolkit
    }

    /// Resolve `ids` from the tool files, falling back to built-in tools.
    pub fn from_config_files(ids: &[String]) -> Self {
        let locator = MergedToolLocator::new(vec![
            Box::new(ConfigFileToolLocator::new(
                ConfigFileToolLocator::default_paths(),
            )),
            Box::new(BuiltinToolLocator),
        ]);
        Self::new(&locator, ids)
    }

    pub fn from_tools(tools: Vec<Tool>) -> Self {
        let mut toolkit = Self::default();
        for tool in tools {
            toolkit.insert(tool);
        }
        toolkit
    }

    fn insert(&mut self, tool: Tool) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Apply a shell timeout to every tool
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self {
            tools: self
                .tools
                .into_iter()
                .map(|(name, tool)| (name, tool.with_timeout(timeout)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for Toolkit {
    fn list_enabled_tools(&self) -> Vec<Tool> {
        self.tools.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::io::Write;

    fn shell_tool(name: &str, command: &str) -> Tool {
        ConfiguredTool {
            name: name.to_string(),
            shell: vec![command.to_string()],
            ..Default::default()
        }
        .into_tool()
        .unwrap()
    }

    fn write_yaml(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_into_tool_builds_schema() {
        let tool = ConfiguredTool {
            name: "log".to_string(),
            description: "Show the git log".to_string(),
            shell: vec!["git log -n {{.n}}".to_string()],
            parameters: vec![ConfiguredToolParameter {
                name: "n".to_string(),
                description: "Number of commits".to_string(),
                param_type: "integer".to_string(),
                required: true,
            }],
            ..Default::default()
        }
        .into_tool()
        .unwrap();

        assert_eq!(tool.name(), "log");
        let schema = &tool.definition().input_schema;
        assert_eq!(schema.properties["n"]["type"], "integer");
        assert_eq!(schema.required, vec!["n".to_string()]);
        assert!(matches!(tool.executor(), Executor::Shell(_)));
    }

    #[test]
    fn test_into_tool_rejects_bad_type() {
        let err = ConfiguredTool {
            name: "bad".to_string(),
            shell: vec!["true".to_string()],
            parameters: vec![ConfiguredToolParameter {
                name: "when".to_string(),
                param_type: "date".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
        .into_tool()
        .unwrap_err();

        assert!(matches!(err, CwcError::InvalidToolSpec(_)));
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn test_into_tool_requires_one_executor_kind() {
        let neither = ConfiguredTool {
            name: "empty".to_string(),
            ..Default::default()
        };
        assert!(neither.into_tool().is_err());

        let both = ConfiguredTool {
            name: "both".to_string(),
            shell: vec!["true".to_string()],
            web: vec!["https://example.com".to_string()],
            ..Default::default()
        };
        assert!(both.into_tool().is_err());

        let web = ConfiguredTool {
            name: "web".to_string(),
            web: vec!["https://example.com".to_string()],
            ..Default::default()
        }
        .into_tool()
        .unwrap();
        assert!(matches!(web.executor(), Executor::Web(_)));
    }

    #[test]
    fn test_config_file_locator_later_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_yaml(
            dir.path(),
            "global.yaml",
            "tools:\n  - name: greet\n    shell: [\"echo global\"]\n  - name: only_global\n    shell: [\"echo g\"]\n",
        );
        let local = write_yaml(
            dir.path(),
            "local.yaml",
            "tools:\n  - name: greet\n    shell: [\"echo local\"]\n",
        );

        let locator = ConfigFileToolLocator::new(vec![global, local]);
        let greet = locator.locate_tool("greet").unwrap();
        match greet.executor() {
            Executor::Shell(shell) => assert_eq!(shell.commands(), ["echo local".to_string()]),
            Executor::Web(_) => panic!("expected shell executor"),
        }
        assert!(locator.locate_tool("only_global").is_some());
        assert!(locator.locate_tool("missing").is_none());
    }

    #[test]
    fn test_config_file_locator_skips_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_yaml(
            dir.path(),
            "good.yaml",
            "tools:\n  - name: greet\n    shell: [\"echo hi\"]\n",
        );
        let broken = write_yaml(dir.path(), "broken.yaml", "tools: [unclosed");

        let locator = ConfigFileToolLocator::new(vec![
            good,
            dir.path().join("does-not-exist.yaml"),
            broken,
        ]);
        assert!(locator.locate_tool("greet").is_some());
    }

    #[test]
    fn test_config_file_locator_falls_back_past_invalid_tool() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_yaml(
            dir.path(),
            "global.yaml",
            "tools:\n  - name: greet\n    shell: [\"echo ok\"]\n",
        );
        let local = write_yaml(
            dir.path(),
            "local.yaml",
            "tools:\n  - name: greet\n    shell: [\"echo bad\"]\n    parameters:\n      - name: x\n        type: date\n",
        );

        let locator = ConfigFileToolLocator::new(vec![global, local]);
        let tool = locator.locate_tool("greet").unwrap();
        match tool.executor() {
            Executor::Shell(shell) => assert_eq!(shell.commands(), ["echo ok".to_string()]),
            Executor::Web(_) => panic!("expected shell executor"),
        }
    }

    #[test]
    fn test_builtin_diff_tool() {
        let tool = BuiltinToolLocator.locate_tool("diff").unwrap();
        assert_eq!(tool.name(), "diff");
        assert_eq!(
            tool.definition().input_schema.required,
            vec!["target".to_string()]
        );
        assert!(BuiltinToolLocator.locate_tool("rm").is_none());
    }

    #[test]
    fn test_toolkit_skips_unknown_ids() {
        let mut locator = MockToolLocator::new();
        locator
            .expect_locate_tool()
            .with(eq("greet"))
            .returning(|_| Some(shell_tool("greet", "echo hi")));
        locator
            .expect_locate_tool()
            .with(eq("nope"))
            .returning(|_| None);

        let toolkit = Toolkit::new(&locator, &["greet".to_string(), "nope".to_string()]);
        assert_eq!(toolkit.len(), 1);
        assert!(toolkit.get("greet").is_some());
        assert!(toolkit.get("nope").is_none());
    }

    #[test]
    fn test_toolkit_lists_sorted_by_name() {
        let toolkit = Toolkit::from_tools(vec![
            shell_tool("zeta", "true"),
            shell_tool("alpha", "true"),
            shell_tool("mid", "true"),
        ]);
        let names: Vec<String> = toolkit
            .list_enabled_tools()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_merged_locator_first_hit_wins() {
        let mut first = MockToolLocator::new();
        first.expect_locate_tool().returning(|id| match id {
            "greet" => Some(shell_tool("greet", "echo first")),
            _ => None,
        });
        let merged = MergedToolLocator::new(vec![Box::new(first), Box::new(BuiltinToolLocator)]);

        assert!(merged.locate_tool("greet").is_some());
        assert_eq!(merged.locate_tool("diff").unwrap().name(), "diff");
        assert!(merged.locate_tool("other").is_none());
    }

    #[tokio::test]
    async fn test_tool_execute_parses_arguments() {
        let tool = shell_tool("echo", "echo {{.target}}");
        assert_eq!(tool.execute(r#"{"target":"main"}"#).await.unwrap(), "main\n");

        let err = tool.execute("{not json").await.unwrap_err();
        assert!(matches!(err, CwcError::ToolArguments(_)));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use cwc::error::CwcError;
use cwc::llm::message::Role;
use cwc::tools::{
    BuiltinToolLocator, ConfigFileToolLocator, DispatchOutcome, MergedToolLocator,
    ToolCallRequest, ToolDispatcher, ToolLocator, ToolRegistry, Toolkit,
};

const GLOBAL_TOOLS: &str = r#"
tools:
  - name: greet
    description: Greet someone
    shell:
      - "echo hello {{.who}}"
    parameters:
      - name: who
        description: Who to greet
        type: string
        required: true
  - name: count
    description: Print a number twice
    shell:
      - "echo {{.n}}"
      - "echo {{.n}}"
    parameters:
      - name: n
        type: integer
        required: true
  - name: docs
    description: Fetch documentation
    web:
      - "https://example.com/docs"
"#;

const PROJECT_TOOLS: &str = r#"
tools:
  - name: greet
    description: Greet someone from the project
    shell:
      - "echo hi {{.who}}"
    parameters:
      - name: who
        type: string
  - name: broken
    shell:
      - "true"
    parameters:
      - name: x
        type: datetime
"#;

struct Fixture {
    _dir: TempDir,
    global: PathBuf,
    project: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("global.yaml");
    let project = dir.path().join("project.yaml");
    std::fs::write(&global, GLOBAL_TOOLS).unwrap();
    std::fs::write(&project, PROJECT_TOOLS).unwrap();
    Fixture {
        _dir: dir,
        global,
        project,
    }
}

fn call(id: &str, name: &str, args: &str) -> ToolCallRequest {
    ToolCallRequest {
        index: 0,
        id: id.to_string(),
        name: name.to_string(),
        args: args.to_string(),
    }
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_later_files_take_precedence() {
    let f = fixture();
    let locator = ConfigFileToolLocator::new(vec![f.global.clone(), f.project.clone()]);

    let greet = locator.locate_tool("greet").unwrap();
    assert_eq!(greet.definition().description, "Greet someone from the project");

    // Only in the global file
    assert!(locator.locate_tool("count").is_some());
    assert!(locator.locate_tool("missing").is_none());
}

#[test]
fn test_invalid_tool_is_skipped() {
    let f = fixture();
    let locator = ConfigFileToolLocator::new(vec![f.global, f.project]);
    assert!(locator.locate_tool("broken").is_none());
}

#[test]
fn test_missing_and_malformed_files_are_skipped() {
    let f = fixture();
    let garbage = f.global.with_file_name("garbage.yaml");
    std::fs::write(&garbage, "tools: [this is: not: valid").unwrap();
    let missing = f.global.with_file_name("nope.yaml");

    let locator = ConfigFileToolLocator::new(vec![f.global.clone(), garbage, missing]);
    assert!(locator.locate_tool("greet").is_some());
}

#[test]
fn test_config_tools_shadow_builtins() {
    let f = fixture();
    let diff_override = f.global.with_file_name("diff.yaml");
    std::fs::write(
        &diff_override,
        "tools:\n  - name: diff\n    description: Custom diff\n    shell: [\"echo custom\"]\n",
    )
    .unwrap();

    let merged = MergedToolLocator::new(vec![
        Box::new(ConfigFileToolLocator::new(vec![diff_override])),
        Box::new(BuiltinToolLocator),
    ]);
    assert_eq!(
        merged.locate_tool("diff").unwrap().definition().description,
        "Custom diff"
    );

    let builtin_only = MergedToolLocator::new(vec![
        Box::new(ConfigFileToolLocator::new(vec![f.global])),
        Box::new(BuiltinToolLocator),
    ]);
    let diff = builtin_only.locate_tool("diff").unwrap();
    assert_eq!(diff.definition().input_schema.required, vec!["target"]);
}

#[test]
fn test_toolkit_lists_tools_sorted_and_skips_unknown() {
    let f = fixture();
    let locator = ConfigFileToolLocator::new(vec![f.global]);
    let toolkit = Toolkit::new(&locator, &ids(&["greet", "count", "nonexistent", "docs"]));

    assert_eq!(toolkit.len(), 3);
    let names: Vec<String> = toolkit
        .list_enabled_tools()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(names, vec!["count", "docs", "greet"]);
}

#[tokio::test]
async fn test_dispatch_renders_and_runs_shell_commands() {
    let f = fixture();
    let locator = ConfigFileToolLocator::new(vec![f.global]);
    let toolkit = Toolkit::new(&locator, &ids(&["greet", "count"]));
    let dispatcher = ToolDispatcher::new(&toolkit);

    let outcome = dispatcher
        .dispatch(&call("c1", "greet", r#"{"who":"world"}"#))
        .await
        .unwrap();
    let DispatchOutcome::Executed(message) = outcome else {
        panic!("greet should run");
    };
    assert_eq!(message.role, Role::Tool);
    assert_eq!(message.tool_call_id.as_deref(), Some("c1"));
    assert_eq!(message.content, "hello world\n");

    // Integer arguments are passed as their JSON text; outputs are joined by newlines
    let outcome = dispatcher
        .dispatch(&call("c2", "count", r#"{"n":42}"#))
        .await
        .unwrap();
    let DispatchOutcome::Executed(message) = outcome else {
        panic!("count should run");
    };
    assert_eq!(message.content, "42\n\n42\n");
}

#[tokio::test]
async fn test_dispatch_unknown_tool() {
    let f = fixture();
    let toolkit = Toolkit::new(&ConfigFileToolLocator::new(vec![f.global]), &ids(&["greet"]));
    let dispatcher = ToolDispatcher::new(&toolkit);

    let outcome = dispatcher.dispatch(&call("c1", "count", "{}")).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::NotFound));
}

#[tokio::test]
async fn test_web_tool_returns_placeholder() {
    let f = fixture();
    let toolkit = Toolkit::new(&ConfigFileToolLocator::new(vec![f.global]), &ids(&["docs"]));
    let dispatcher = ToolDispatcher::new(&toolkit);

    let outcome = dispatcher.dispatch(&call("w", "docs", "")).await.unwrap();
    let DispatchOutcome::Executed(message) = outcome else {
        panic!("docs should run");
    };
    assert_eq!(message.content, cwc::tools::web::WEB_PLACEHOLDER);
}

#[tokio::test]
async fn test_dispatch_bad_arguments_is_error() {
    let f = fixture();
    let toolkit = Toolkit::new(&ConfigFileToolLocator::new(vec![f.global]), &ids(&["greet"]));
    let dispatcher = ToolDispatcher::new(&toolkit);

    let err = dispatcher
        .dispatch(&call("c1", "greet", "not json"))
        .await
        .unwrap_err();
    assert!(matches!(err, CwcError::ToolArguments(_)));
}

#[tokio::test]
async fn test_timeout_applies_to_configured_tools() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tools.yaml");
    std::fs::write(&path, "tools:\n  - name: slow\n    shell: [\"sleep 5\"]\n").unwrap();

    let toolkit = Toolkit::new(&ConfigFileToolLocator::new(vec![path]), &ids(&["slow"]))
        .with_timeout(Some(Duration::from_millis(100)));
    let dispatcher = ToolDispatcher::new(&toolkit);

    let err = dispatcher.dispatch(&call("s", "slow", "{}")).await.unwrap_err();
    assert!(err.is_tool_failure());
}

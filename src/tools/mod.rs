// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for cwc
//!
//! Tools are local capabilities the model may ask to run mid-conversation.
//! They are declared in `tools.yaml` files (or built in), resolved into a
//! [`Toolkit`] before a session starts, and executed by the
//! [`ToolDispatcher`] once the [`ToolCallAssembler`] has rebuilt a complete
//! request from the response stream.
//!
//! # Tool files
//!
//! ```yaml
//! tools:
//!   - name: diff
//!     description: Get the git diff between two refs.
//!     shell:
//!       - git diff {{or .source ""}} {{.target}}
//!     parameters:
//!       - name: target
//!         type: string
//!         required: true
//! ```

pub mod assembler;
pub mod definition;
pub mod dispatcher;
pub mod registry;
pub mod shell;
pub mod template;
pub mod web;

pub use assembler::{ToolCallAssembler, ToolCallRequest};
pub use definition::{ParameterType, SchemaBuilder};
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use registry::{
    BuiltinToolLocator, ConfigFileToolLocator, ConfiguredTool, ConfiguredToolParameter, Executor,
    MergedToolLocator, Tool, ToolConfig, ToolLocator, ToolRegistry, Toolkit,
};
pub use shell::ShellExecutor;
pub use web::WebExecutor;

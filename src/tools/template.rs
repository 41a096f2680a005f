// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command templates
//!
//! Tool commands are written with `{{.name}}` placeholders. The supported
//! actions are a variable reference, a quoted literal, and
//! `{{or .a .b "fallback"}}` which yields its first non-empty operand.
//! Variables missing from the arguments render as an empty string.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{CwcError, Result};

/// Flat string arguments of a tool call
pub type TemplateArgs = HashMap<String, String>;

fn action_regex() -> Result<&'static Regex> {
    static ACTION: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    ACTION
        .get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| CwcError::Template(e.clone()))
}

fn token_regex() -> Result<&'static Regex> {
    static TOKEN: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r#""(?:[^"\\]|\\.)*"|\S+"#).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| CwcError::Template(e.clone()))
}

/// Render `template`, substituting `args`.
pub fn render(template: &str, args: &TemplateArgs) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in action_regex()?.captures_iter(template) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_literal(&mut out, &template[last..whole.start()])?;
        out.push_str(&evaluate(body.as_str(), args)?);
        last = whole.end();
    }

    push_literal(&mut out, &template[last..])?;
    Ok(out)
}

fn push_literal(out: &mut String, literal: &str) -> Result<()> {
    if literal.contains("{{") {
        return Err(CwcError::Template(format!(
            "unclosed action in template near '{}'",
            literal.trim()
        )));
    }
    out.push_str(literal);
    Ok(())
}

fn evaluate(action: &str, args: &TemplateArgs) -> Result<String> {
    let tokens: Vec<&str> = token_regex()?
        .find_iter(action)
        .map(|m| m.as_str())
        .collect();

    match tokens.as_slice() {
        [] => Err(CwcError::Template("empty action".to_string())),
        ["or", operands @ ..] if !operands.is_empty() => {
            for operand in operands {
                let value = operand_value(operand, args)?;
                if !value.is_empty() {
                    return Ok(value);
                }
            }
            Ok(String::new())
        }
        [single] => operand_value(single, args),
        _ => Err(CwcError::Template(format!(
            "unsupported action '{}'",
            action.trim()
        ))),
    }
}

fn operand_value(token: &str, args: &TemplateArgs) -> Result<String> {
    if let Some(name) = token.strip_prefix('.') {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(CwcError::Template(format!("invalid variable '{}'", token)));
        }
        return Ok(args.get(name).cloned().unwrap_or_default());
    }

    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return serde_json::from_str::<String>(token)
            .map_err(|e| CwcError::Template(format!("invalid string literal {}: {}", token, e)));
    }

    Err(CwcError::Template(format!("unsupported operand '{}'", token)))
}

/// Parse tool call arguments as a flat JSON object.
///
/// Strings are taken as-is, numbers and booleans by their JSON text, and
/// `null` leaves the variable unset. Blank input means no arguments.
pub fn parse_arguments(raw: &str) -> Result<TemplateArgs> {
    if raw.trim().is_empty() {
        return Ok(TemplateArgs::new());
    }

    let object: serde_json::Map<String, Value> = serde_json::from_str(raw)
        .map_err(|e| CwcError::ToolArguments(format!("error parsing arguments: {}", e)))?;

    let mut args = TemplateArgs::with_capacity(object.len());
    for (key, value) in object {
        match value {
            Value::String(s) => {
                args.insert(key, s);
            }
            Value::Number(n) => {
                args.insert(key, n.to_string());
            }
            Value::Bool(b) => {
                args.insert(key, b.to_string());
            }
            Value::Null => {}
            Value::Array(_) | Value::Object(_) => {
                return Err(CwcError::ToolArguments(format!(
                    "argument '{}' must be a string, number or boolean",
                    key
                )));
            }
        }
    }

    Ok(args)
}

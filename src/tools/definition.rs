// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! Parameter types accepted in tool configuration and the builder that turns
//! them into the JSON schema advertised to the model.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::CwcError;
use crate::llm::provider::ToolInputSchema;

/// JSON schema type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    pub const ALL: [ParameterType; 6] = [
        ParameterType::String,
        ParameterType::Integer,
        ParameterType::Number,
        ParameterType::Boolean,
        ParameterType::Object,
        ParameterType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = CwcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|ty| ty.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|ty| ty.as_str()).collect();
                CwcError::InvalidToolSpec(format!(
                    "invalid data type: {}. supported types: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

/// Helper to create a tool input schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    /// Add a property of any supported type
    pub fn property(
        mut self,
        name: &str,
        description: &str,
        ty: ParameterType,
        required: bool,
    ) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": ty.as_str(),
                "description": description
            }),
        );
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string property
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, description, ParameterType::String, required)
    }

    /// Build the schema
    pub fn build(self) -> ToolInputSchema {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Value::Object(self.properties),
            required: self.required,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible chat completions provider
//!
//! Streams `chat/completions` over SSE and maps every `data:` chunk onto
//! [`ResponseFragment`]s. Works against OpenAI, Azure OpenAI deployments
//! (when an API version is configured) and any compatible gateway.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, CwcError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{
    CompletionRequest, FinishReason, FragmentStream, LlmProvider, ResponseFragment, ToolDefinition,
};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Provider for OpenAI-compatible endpoints
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    api_version: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider against the public OpenAI API
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, OPENAI_API_URL)
    }

    /// Create with a custom base URL (everything before `/chat/completions`)
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_version: None,
        }
    }

    /// Talk to an Azure deployment: adds `api-version` and uses the `api-key` header
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    fn endpoint(&self) -> String {
        match &self.api_version {
            Some(version) => format!(
                "{}/chat/completions?api-version={}",
                self.base_url, version
            ),
            None => format!("{}/chat/completions", self.base_url),
        }
    }

    /// Convert history entries to the wire format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|call| OpenAiToolCall {
                                id: call.id.clone(),
                                r#type: "function".to_string(),
                                function: OpenAiFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                // Assistant messages that only carry tool calls send `content: null`
                let content = if tool_calls.is_some() && m.content.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                };

                OpenAiMessage {
                    role: m.role.as_str().to_string(),
                    content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    /// Convert tools to the wire format
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: serde_json::to_value(&t.input_schema)
                        .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
                },
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: self.convert_messages(&request.messages),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(self.convert_tools(&request.tools))
            },
            stream: true,
        }
    }

    /// Parse an error response
    fn parse_error(status: u16, body: &str) -> CwcError {
        let Ok(error_response) = serde_json::from_str::<OpenAiError>(body) else {
            return CwcError::Api(match status {
                401 | 403 => ApiError::AuthenticationFailed,
                _ => ApiError::ServerError {
                    status,
                    message: body.to_string(),
                },
            });
        };

        let message = error_response.error.message;
        let code = error_response.error.code.as_deref().unwrap_or("");

        let api_error = match (status, code) {
            (401, _) | (_, "invalid_api_key") => ApiError::AuthenticationFailed,
            (429, _) | (_, "rate_limit_exceeded") => ApiError::RateLimited(message),
            (404, _) | (_, "model_not_found") | (_, "DeploymentNotFound") => {
                ApiError::ModelNotFound(message)
            }
            _ => ApiError::ServerError { status, message },
        };
        CwcError::Api(api_error)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let body = self.build_request(&request);

        tracing::debug!(
            target: "cwc.llm.openai",
            model = %self.model,
            messages = body.messages.len(),
            tools = request.tools.len(),
            "opening completion stream"
        );

        let mut req = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        req = match self.api_version {
            Some(_) => req.header("api-key", &self.api_key),
            None => req.header("Authorization", format!("Bearer {}", &self.api_key)),
        };

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| CwcError::Api(ApiError::Network(e.to_string())))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &body));
        }

        // `None` marks the end of the body so an unterminated last line is still decoded
        let fragments = response
            .bytes_stream()
            .map(Some)
            .chain(futures::stream::once(futures::future::ready(None)))
            .scan(SseDecoder::default(), |decoder, chunk| {
                let items = match chunk {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => {
                        vec![Err(CwcError::Api(ApiError::StreamError(e.to_string())))]
                    }
                    None => decoder.finish(),
                };
                futures::future::ready(Some(items))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(fragments))
    }
}

/// Incremental decoder for the SSE body of a streamed completion
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Feed raw bytes, returning every fragment completed by them
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Result<ResponseFragment>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut out);
        }
        out
    }

    /// Decode whatever the body left without a trailing newline
    pub(crate) fn finish(&mut self) -> Vec<Result<ResponseFragment>> {
        let rest = std::mem::take(&mut self.buffer);
        let mut out = Vec::new();
        self.decode_line(&rest, &mut out);
        out
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<Result<ResponseFragment>>) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();

        if self.done || line.is_empty() || line.starts_with(':') {
            return;
        }

        let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
            return;
        };

        if data == "[DONE]" {
            self.done = true;
            return;
        }

        out.extend(Self::decode_chunk(data));
    }

    fn decode_chunk(data: &str) -> Vec<Result<ResponseFragment>> {
        // Error payloads would also decode as a chunk with no choices
        if let Ok(error) = serde_json::from_str::<OpenAiError>(data) {
            return vec![Err(CwcError::Api(ApiError::StreamError(
                error.error.message,
            )))];
        }

        let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => chunk,
            Err(parse_err) => {
                tracing::debug!(
                    target: "cwc.llm.openai",
                    error = %parse_err,
                    "skipping undecodable stream chunk"
                );
                return Vec::new();
            }
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };

        let mut fragments = Vec::new();
        let role = choice.delta.role.as_deref().and_then(parse_role);
        let content = choice.delta.content.unwrap_or_default();

        if role.is_some() || !content.is_empty() {
            fragments.push(ResponseFragment {
                role,
                content_delta: content,
                ..Default::default()
            });
        }

        for call in choice.delta.tool_calls.unwrap_or_default() {
            let function = call.function.unwrap_or_default();
            fragments.push(ResponseFragment::tool_call(
                call.index.unwrap_or(0),
                call.id.unwrap_or_default(),
                function.name.unwrap_or_default(),
                function.arguments.unwrap_or_default(),
            ));
        }

        if let Some(reason) = choice.finish_reason.as_deref().and_then(FinishReason::from_wire) {
            fragments.push(ResponseFragment::finish(reason));
        }

        fragments.into_iter().map(Ok).collect()
    }
}

fn parse_role(role: &str) -> Option<Role> {
    match role {
        "system" => Some(Role::System),
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        "tool" => Some(Role::Tool),
        _ => None,
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    code: Option<String>,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    role: Option<String>,
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a scripted implementation of the LlmProvider trait that replays
//! fragment sequences without making real API calls.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ApiError, CwcError, Result};
use crate::llm::message::Role;
use crate::llm::provider::{
    CompletionRequest, FinishReason, FragmentStream, LlmProvider, ResponseFragment,
};

/// A mock LLM provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Scripted responses, replayed in order
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Delay before each fragment is yielded
    fragment_delay: Option<Duration>,
}

/// One step of a scripted stream
#[derive(Clone, Debug)]
pub enum MockStep {
    /// Yield a fragment
    Fragment(ResponseFragment),
    /// Fail mid-read with a stream error
    Error(String),
}

/// A pre-configured response for the mock provider
#[derive(Clone, Debug, Default)]
pub struct MockResponse {
    /// Steps replayed by the stream
    pub steps: Vec<MockStep>,
    /// Fail to open the stream at all
    pub open_error: Option<String>,
}

impl MockResponse {
    /// Plain text streamed in small pieces, then `stop`
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut fragments = Vec::new();
        for (i, chunk) in text.chars().collect::<Vec<_>>().chunks(10).enumerate() {
            let piece = ResponseFragment::content(chunk.iter().collect::<String>());
            fragments.push(if i == 0 {
                piece.with_role(Role::Assistant)
            } else {
                piece
            });
        }
        fragments.push(ResponseFragment::finish(FinishReason::Stop));
        Self::fragments(fragments)
    }

    /// A single tool call split into an opening and an argument fragment, then `tool_calls`
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::fragments(vec![
            ResponseFragment::tool_call(0, id, name, "").with_role(Role::Assistant),
            ResponseFragment::tool_call(0, "", "", arguments),
            ResponseFragment::finish(FinishReason::ToolCalls),
        ])
    }

    /// An explicit fragment sequence
    pub fn fragments(fragments: Vec<ResponseFragment>) -> Self {
        Self {
            steps: fragments.into_iter().map(MockStep::Fragment).collect(),
            open_error: None,
        }
    }

    /// Fragments followed by a mid-stream failure
    pub fn failing_after(fragments: Vec<ResponseFragment>, message: impl Into<String>) -> Self {
        let mut response = Self::fragments(fragments);
        response.steps.push(MockStep::Error(message.into()));
        response
    }

    /// The stream cannot be opened
    pub fn open_error(message: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            open_error: Some(message.into()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock provider lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MockProvider {
    /// Create a new mock provider that answers "Mock response"
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: Arc::new(Mutex::new(vec![MockResponse::text("Mock response")])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            fragment_delay: None,
        }
    }

    /// Answer every request with the same text
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_responses(vec![MockResponse::text(text)])
    }

    /// Queue multiple responses (returned in order, the last one repeats)
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *lock(&self.responses) = responses;
        self
    }

    /// Sleep before yielding each fragment
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    /// Get the number of times complete_stream() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    fn next_response(&self) -> MockResponse {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = lock(&self.responses);
        if responses.is_empty() {
            MockResponse::text("Mock response")
        } else {
            responses[count.min(responses.len() - 1)].clone()
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        lock(&self.recorded_requests).push(request);

        let response = self.next_response();
        if let Some(message) = response.open_error {
            return Err(CwcError::Api(ApiError::Network(message)));
        }

        let items: Vec<Result<ResponseFragment>> = response
            .steps
            .into_iter()
            .map(|step| match step {
                MockStep::Fragment(fragment) => Ok(fragment),
                MockStep::Error(message) => Err(CwcError::Api(ApiError::StreamError(message))),
            })
            .collect();

        match self.fragment_delay {
            Some(delay) => Ok(Box::pin(stream::iter(items).then(move |item| async move {
                tokio::time::sleep(delay).await;
                item
            }))),
            None => Ok(Box::pin(stream::iter(items))),
        }
    }
}

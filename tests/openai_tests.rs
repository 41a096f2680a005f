// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cwc::chat::{Chat, ConversationChunk};
use cwc::error::{ApiError, CwcError};
use cwc::llm::message::{Message, Role};
use cwc::llm::provider::{CompletionRequest, FinishReason, LlmProvider, ResponseFragment};
use cwc::llm::providers::OpenAiProvider;
use cwc::tools::{ConfiguredTool, ConfiguredToolParameter, Toolkit};

fn sse(events: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

const TEXT_STREAM: &[&str] = &[
    r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
    r#"{"choices":[{"index":0,"delta":{"content":"Hello"}}]}"#,
    r#"{"choices":[{"index":0,"delta":{"content":" there"}}]}"#,
    r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
];

const TOOL_STREAM: &[&str] = &[
    r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":null,"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"greet","arguments":""}}]}}]}"#,
    r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"who\":"}}]}}]}"#,
    r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"world\"}"}}]}}]}"#,
    r#"{"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
];

async fn collect(provider: &OpenAiProvider) -> Vec<ResponseFragment> {
    let request = CompletionRequest::new(vec![Message::system("sys"), Message::user("hi")]);
    let stream = provider.complete_stream(request).await.unwrap();
    stream.map(|item| item.unwrap()).collect().await
}

#[tokio::test]
async fn test_streams_text_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_string_contains(r#""stream":true"#))
        .respond_with(sse(TEXT_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAiProvider::with_base_url("sk-test", "gpt-4o-mini", format!("{}/v1/", server.uri()));
    let fragments = collect(&provider).await;

    assert_eq!(fragments[0].role, Some(Role::Assistant));
    let text: String = fragments.iter().map(|f| f.content_delta.as_str()).collect();
    assert_eq!(text, "Hello there");
    assert_eq!(
        fragments.last().unwrap().finish_reason,
        Some(FinishReason::Stop)
    );
}

#[tokio::test]
async fn test_azure_uses_api_key_header_and_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt4/chat/completions"))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", "azure-key"))
        .respond_with(sse(TEXT_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url(
        "azure-key",
        "gpt4",
        format!("{}/openai/deployments/gpt4", server.uri()),
    )
    .with_api_version("2024-02-01");
    let fragments = collect(&provider).await;
    assert!(fragments.iter().any(|f| f.content_delta == "Hello"));
}

#[tokio::test]
async fn test_tool_call_deltas_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(TOOL_STREAM))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("k", "m", server.uri());
    let fragments = collect(&provider).await;

    let calls: Vec<_> = fragments.iter().filter_map(|f| f.tool_call.as_ref()).collect();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name_delta, "greet");
    let args: String = calls.iter().map(|c| c.args_delta.as_str()).collect();
    assert_eq!(args, r#"{"who":"world"}"#);
    assert_eq!(
        fragments.last().unwrap().finish_reason,
        Some(FinishReason::ToolCalls)
    );
}

#[tokio::test]
async fn test_final_event_without_trailing_newline_is_decoded() {
    let server = MockServer::start().await;
    // No [DONE] and no newline after the last event
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: {}\n\ndata: {}",
        TOOL_STREAM[0], TOOL_STREAM[1], TOOL_STREAM[2], TOOL_STREAM[3]
    );
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("k", "m", server.uri());
    let fragments = collect(&provider).await;

    assert_eq!(
        fragments.last().unwrap().finish_reason,
        Some(FinishReason::ToolCalls)
    );
    let args: String = fragments
        .iter()
        .filter_map(|f| f.tool_call.as_ref())
        .map(|c| c.args_delta.as_str())
        .collect();
    assert_eq!(args, r#"{"who":"world"}"#);
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        ))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("bad", "m", server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]);
    let err = provider.complete_stream(request).await.err().unwrap();
    assert!(matches!(err, CwcError::Api(ApiError::AuthenticationFailed)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string(
            r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#,
        ))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("k", "m", server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]);
    match provider.complete_stream(request).await {
        Err(CwcError::Api(ApiError::RateLimited(message))) => {
            assert!(message.contains("Rate limit reached"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected rate limit error"),
    }
}

#[tokio::test]
async fn test_chat_runs_tool_round_against_backend() {
    let server = MockServer::start().await;

    // The follow-up request carries the tool result
    Mock::given(method("POST"))
        .and(body_string_contains(r#""tool_call_id":"call_1""#))
        .respond_with(sse(&[
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"It said hello world."}}]}"#,
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains(r#""name":"greet""#))
        .respond_with(sse(TOOL_STREAM))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let greet = ConfiguredTool {
        name: "greet".into(),
        description: "Greet someone".into(),
        shell: vec!["echo hello {{.who}}".into()],
        parameters: vec![ConfiguredToolParameter {
            name: "who".into(),
            description: "Who to greet".into(),
            param_type: "string".into(),
            required: true,
        }],
        ..Default::default()
    };
    let toolkit = Toolkit::from_tools(vec![greet.into_tool().unwrap()]);

    let chunks = Arc::new(Mutex::new(Vec::<ConversationChunk>::new()));
    let sink = chunks.clone();
    let provider = Arc::new(OpenAiProvider::with_base_url("k", "m", server.uri()));
    let chat = Chat::new(provider, "sys", move |chunk: ConversationChunk| {
        sink.lock().unwrap().push(chunk);
    })
    .use_toolkit(&toolkit);

    let conversation = chat.begin_conversation("say hello").await.unwrap();
    conversation.wait_my_turn().await;

    let history = conversation.history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[2].tool_calls[0].arguments, r#"{"who":"world"}"#);
    assert_eq!(history[3].content, "hello world\n");
    assert_eq!(history[4].content, "It said hello world.");

    let chunks = chunks.lock().unwrap();
    assert!(!chunks.iter().any(|c| c.is_error));
    assert!(chunks.last().unwrap().is_final);
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Turn worker
//!
//! One turn is a loop of request cycles: send the history, stream the
//! response, and either commit the text (turn over) or run the requested
//! tools, append their results and go around again.

use futures::StreamExt;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::chat::chunk::{ChunkEmitter, ConversationObserver};
use crate::error::{CwcError, Result};
use crate::llm::message::{Message, ToolCall};
use crate::llm::provider::{CompletionRequest, LlmProvider};
use crate::tools::assembler::{ToolCallAssembler, ToolCallRequest};
use crate::tools::dispatcher::{DispatchOutcome, ToolDispatcher};

pub(crate) type SharedHistory = Arc<Mutex<Vec<Message>>>;

pub(crate) fn lock_history(history: &Mutex<Vec<Message>>) -> MutexGuard<'_, Vec<Message>> {
    match history.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(target: "cwc.chat.turn", "history lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    RequestPending,
    StreamingText,
    StreamingToolCall,
    Dispatching,
    TurnComplete { error: bool },
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => f.write_str("idle"),
            TurnState::RequestPending => f.write_str("request_pending"),
            TurnState::StreamingText => f.write_str("streaming_text"),
            TurnState::StreamingToolCall => f.write_str("streaming_tool_call"),
            TurnState::Dispatching => f.write_str("dispatching"),
            TurnState::TurnComplete { error: false } => f.write_str("turn_complete"),
            TurnState::TurnComplete { error: true } => f.write_str("turn_failed"),
        }
    }
}

/// Everything a turn needs besides the history
pub(crate) struct TurnContext {
    pub(crate) provider: Arc<dyn LlmProvider>,
    pub(crate) observer: Arc<dyn ConversationObserver>,
    pub(crate) dispatcher: ToolDispatcher,
    pub(crate) max_tool_rounds: usize,
}

/// How one request cycle ended
enum CycleEnd {
    Text(String),
    ToolCalls {
        text: String,
        calls: Vec<ToolCallRequest>,
    },
}

struct TurnWorker<'a> {
    ctx: &'a TurnContext,
    history: &'a Mutex<Vec<Message>>,
    emitter: ChunkEmitter,
    assembler: ToolCallAssembler,
    state: TurnState,
    turn: u64,
    cycle: usize,
}

/// Run one turn to completion. Never fails: errors end the turn with an
/// error chunk and roll back what the failed exchange appended.
pub(crate) async fn run_turn(ctx: Arc<TurnContext>, history: SharedHistory, turn: u64) {
    let (start_len, prompt) = {
        let history = lock_history(&history);
        let prompt = history.last().map(|m| (m.id, m.timestamp));
        (history.len(), prompt)
    };

    tracing::info!(
        target: "cwc.chat.turn",
        turn,
        provider = ctx.provider.name(),
        messages = start_len,
        tools = ctx.dispatcher.definitions().len(),
        "turn start"
    );

    let mut worker = TurnWorker {
        ctx: &ctx,
        history: &history,
        emitter: ChunkEmitter::new(ctx.observer.clone()),
        assembler: ToolCallAssembler::new(),
        state: TurnState::Idle,
        turn,
        cycle: 0,
    };

    match worker.run().await {
        Ok(()) => {
            worker.transition(TurnState::TurnComplete { error: false });
            let history = lock_history(&history);
            let answered = history.last();
            tracing::info!(
                target: "cwc.chat.turn",
                turn,
                cycles = worker.cycle,
                messages = history.len(),
                prompt_id = ?prompt.map(|(id, _)| id),
                answer_id = ?answered.map(|m| m.id),
                elapsed_ms = ?answered.zip(prompt).map(|(m, (_, at))| m.millis_since(at)),
                "turn complete"
            );
        }
        Err(error) => {
            if !error.keeps_turn_history() {
                let mut history = lock_history(&history);
                let dropped: Vec<String> = history
                    .get(start_len..)
                    .unwrap_or_default()
                    .iter()
                    .map(|m| m.id.to_string())
                    .collect();
                history.truncate(start_len);
                tracing::info!(
                    target: "cwc.chat.turn",
                    turn,
                    messages = start_len,
                    dropped = ?dropped,
                    "rolled back failed exchange"
                );
            }
            worker.transition(TurnState::TurnComplete { error: true });
            tracing::warn!(target: "cwc.chat.turn", turn, error = %error, "turn failed");
            worker.emitter.error(&error);
        }
    }
}

impl TurnWorker<'_> {
    fn transition(&mut self, next: TurnState) {
        tracing::trace!(
            target: "cwc.chat.turn",
            turn = self.turn,
            cycle = self.cycle,
            from = %self.state,
            to = %next,
            "turn state"
        );
        self.state = next;
    }

    fn append(&self, message: Message) {
        lock_history(self.history).push(message);
    }

    async fn run(&mut self) -> Result<()> {
        let mut rounds = 0;

        loop {
            self.cycle += 1;
            match self.request_cycle().await? {
                CycleEnd::Text(text) => {
                    self.append(Message::assistant(text));
                    self.emitter.finish();
                    return Ok(());
                }
                CycleEnd::ToolCalls { text, calls } => {
                    self.emitter.close_segment();

                    rounds += 1;
                    if rounds > self.ctx.max_tool_rounds {
                        return Err(CwcError::ToolRoundLimit(self.ctx.max_tool_rounds));
                    }

                    self.transition(TurnState::Dispatching);
                    let recorded: Vec<ToolCall> = calls.iter().cloned().map(Into::into).collect();
                    self.append(Message::assistant_tool_calls(text, recorded));

                    for call in &calls {
                        let result = self.dispatch(call).await;
                        self.append(result);
                    }
                    self.assembler.flush();
                }
            }
        }
    }

    async fn request_cycle(&mut self) -> Result<CycleEnd> {
        self.transition(TurnState::RequestPending);
        self.assembler.flush();

        let messages = lock_history(self.history).clone();
        let request = CompletionRequest::new(messages)
            .with_tools(self.ctx.dispatcher.definitions().to_vec());

        tracing::debug!(
            target: "cwc.chat.turn",
            turn = self.turn,
            cycle = self.cycle,
            messages = request.messages.len(),
            "sending request"
        );

        let mut stream = self.ctx.provider.complete_stream(request).await?;
        let mut text = String::new();

        while let Some(item) = stream.next().await {
            let fragment = item?;

            if !fragment.content_delta.is_empty() {
                if self.state != TurnState::StreamingText {
                    self.transition(TurnState::StreamingText);
                }
                text.push_str(&fragment.content_delta);
                self.emitter.content(&fragment.content_delta);
            }

            if fragment.tool_call.is_some() && self.state != TurnState::StreamingToolCall {
                self.transition(TurnState::StreamingToolCall);
            }
            self.assembler.collect(&fragment);

            if fragment.is_terminal() {
                break;
            }
        }

        if !self.assembler.is_ready() {
            if self.assembler.has_fragments() {
                tracing::debug!(
                    target: "cwc.chat.turn",
                    turn = self.turn,
                    "tool call fragments without tool_calls finish, ignoring"
                );
            }
            return Ok(CycleEnd::Text(text));
        }

        let calls = self.assembler.detected_calls();
        if calls.is_empty() {
            tracing::warn!(
                target: "cwc.chat.turn",
                turn = self.turn,
                "finish reason tool_calls but no call was assembled, treating as stop"
            );
            return Ok(CycleEnd::Text(text));
        }

        tracing::debug!(
            target: "cwc.chat.turn",
            turn = self.turn,
            cycle = self.cycle,
            tool_calls = calls.len(),
            "tool calls detected"
        );
        Ok(CycleEnd::ToolCalls { text, calls })
    }

    /// Run one call and produce the tool message answering it
    async fn dispatch(&self, call: &ToolCallRequest) -> Message {
        let observer = self.emitter.observer();
        observer.on_tool_invocation(call);

        match self.ctx.dispatcher.dispatch(call).await {
            Ok(DispatchOutcome::Executed(message)) => message,
            Ok(DispatchOutcome::NotFound) => {
                let warning = format!("tool '{}' is not available", call.name);
                tracing::warn!(
                    target: "cwc.chat.turn",
                    turn = self.turn,
                    tool = %call.name,
                    "model requested an unknown tool"
                );
                observer.on_tool_warning(&call.name, &warning);
                Message::tool(call.id.clone(), warning)
            }
            Err(error) => {
                tracing::warn!(
                    target: "cwc.chat.turn",
                    turn = self.turn,
                    tool = %call.name,
                    error = %error,
                    "tool execution failed"
                );
                observer.on_tool_warning(&call.name, &error.to_string());
                Message::tool(
                    call.id.clone(),
                    format!("error executing tool '{}': {}", call.name, error),
                )
            }
        }
    }
}

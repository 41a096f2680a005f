// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat sessions
//!
//! A [`Chat`] holds what stays fixed for a session: the backend, the system
//! message, the observer and the resolved tools. Starting a conversation
//! returns a [`Conversation`] handle that owns the history and runs each
//! turn on its own task.
//!
//! At most one turn is pending per conversation. The turn worker holds the
//! conversation's slot for the whole turn, including tool rounds; `reply`
//! waits for the slot, `try_reply` refuses when it is taken and
//! `wait_my_turn` returns once it is free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::chat::chunk::ConversationObserver;
use crate::chat::turn::{self, lock_history, SharedHistory, TurnContext};
use crate::error::{CwcError, Result};
use crate::llm::message::Message;
use crate::llm::provider::LlmProvider;
use crate::tools::dispatcher::ToolDispatcher;
use crate::tools::registry::ToolRegistry;

/// Tool rounds allowed in one turn unless configured otherwise
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 16;

/// Session configuration shared by all of its conversations
pub struct Chat {
    provider: Arc<dyn LlmProvider>,
    system_message: String,
    observer: Arc<dyn ConversationObserver>,
    dispatcher: ToolDispatcher,
    max_tool_rounds: usize,
}

impl Chat {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        system_message: impl Into<String>,
        observer: impl ConversationObserver + 'static,
    ) -> Self {
        Self::with_observer(provider, system_message, Arc::new(observer))
    }

    pub fn with_observer(
        provider: Arc<dyn LlmProvider>,
        system_message: impl Into<String>,
        observer: Arc<dyn ConversationObserver>,
    ) -> Self {
        Self {
            provider,
            system_message: system_message.into(),
            observer,
            dispatcher: ToolDispatcher::default(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Resolve the registry's enabled tools. They are not re-queried later.
    pub fn use_toolkit(mut self, registry: &dyn ToolRegistry) -> Self {
        self.dispatcher = ToolDispatcher::new(registry);
        tracing::debug!(
            target: "cwc.chat.session",
            tools = self.dispatcher.definitions().len(),
            "tools resolved"
        );
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Start a conversation and its first turn.
    ///
    /// Returns once the turn has been started; use
    /// [`Conversation::wait_my_turn`] to wait for it.
    pub async fn begin_conversation(&self, initial: impl Into<String>) -> Result<Conversation> {
        let conversation = Conversation {
            ctx: Arc::new(TurnContext {
                provider: self.provider.clone(),
                observer: self.observer.clone(),
                dispatcher: self.dispatcher.clone(),
                max_tool_rounds: self.max_tool_rounds,
            }),
            history: Arc::new(Mutex::new(vec![Message::system(
                self.system_message.clone(),
            )])),
            slot: Arc::new(AsyncMutex::new(())),
            turns: Arc::new(AtomicU64::new(0)),
        };

        tracing::debug!(target: "cwc.chat.session", "conversation started");
        conversation.reply(initial).await?;
        Ok(conversation)
    }
}

/// Handle to a running conversation. Clones share the same history and slot.
#[derive(Clone)]
pub struct Conversation {
    ctx: Arc<TurnContext>,
    history: SharedHistory,
    slot: Arc<AsyncMutex<()>>,
    turns: Arc<AtomicU64>,
}

fn validate(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(CwcError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Conversation {
    /// Append a user message and start a turn for it.
    ///
    /// If a turn is still pending this waits for it first, so history stays
    /// in call order. Returns as soon as the new turn is started.
    pub async fn reply(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        validate(&message)?;

        let slot = self.slot.clone().lock_owned().await;
        self.start_turn(slot, message)
    }

    /// Like [`reply`](Self::reply) but fails with [`CwcError::TurnPending`]
    /// instead of waiting.
    pub fn try_reply(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        validate(&message)?;

        let slot = self
            .slot
            .clone()
            .try_lock_owned()
            .map_err(|_| CwcError::TurnPending)?;
        self.start_turn(slot, message)
    }

    /// Wait until the pending turn, tool rounds included, has completed.
    pub async fn wait_my_turn(&self) {
        let _slot = self.slot.lock().await;
    }

    /// Whether a turn is running
    pub fn is_pending(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    /// Snapshot of the history, system message first
    pub fn history(&self) -> Vec<Message> {
        lock_history(&self.history).clone()
    }

    fn start_turn(&self, slot: OwnedMutexGuard<()>, message: String) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CwcError::InvalidInput(format!("no async runtime: {}", e)))?;

        lock_history(&self.history).push(Message::user(message));
        let turn = self.turns.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(target: "cwc.chat.session", turn, "turn scheduled");

        let ctx = self.ctx.clone();
        let history = self.history.clone();
        runtime.spawn(async move {
            let _slot = slot;
            turn::run_turn(ctx, history, turn).await;
        });
        Ok(())
    }
}

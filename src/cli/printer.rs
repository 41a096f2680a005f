// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Terminal output for conversation chunks

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, MutexGuard};

use crate::chat::{ConversationChunk, ConversationObserver};
use crate::tools::ToolCallRequest;

/// Write `text`, coloured when `color` is set
pub fn paint(out: &mut impl Write, color: Option<Color>, text: &str) -> io::Result<()> {
    match color {
        Some(color) => crossterm::queue!(out, SetForegroundColor(color), Print(text), ResetColor)?,
        None => out.write_all(text.as_bytes())?,
    }
    out.flush()
}

/// Prints chunks as they stream in
pub struct ChunkPrinter<W: Write + Send> {
    out: Mutex<W>,
    color: bool,
}

impl ChunkPrinter<io::Stdout> {
    /// Print to stdout, coloured when it is a terminal
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> ChunkPrinter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, color: Color, text: &str) {
        let color = self.color.then_some(color);
        if let Err(e) = paint(&mut *self.lock(), color, text) {
            tracing::debug!(target: "cwc.cli", error = %e, "failed to write output");
        }
    }

    fn write_plain(&self, text: &str) {
        let mut out = self.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            tracing::debug!(target: "cwc.cli", error = %e, "failed to write output");
        }
    }
}

impl<W: Write + Send> ConversationObserver for ChunkPrinter<W> {
    fn on_chunk(&self, chunk: ConversationChunk) {
        if chunk.is_initial {
            self.write(Color::Cyan, "🤖: ");
        }
        if chunk.is_error {
            self.write(Color::Red, &chunk.content);
        } else if !chunk.content.is_empty() {
            self.write_plain(&chunk.content);
        }
        if chunk.is_final {
            self.write_plain("\n");
        }
    }

    fn on_tool_invocation(&self, request: &ToolCallRequest) {
        self.write(Color::DarkGrey, &format!("[running tool '{}']\n", request.name));
    }

    fn on_tool_warning(&self, tool: &str, message: &str) {
        self.write(Color::Yellow, &format!("[tool '{}': {}]\n", tool, message));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interactive and one-shot chat drivers

use crossterm::style::Color;
use std::io::{BufRead, Write};

use crate::chat::Chat;
use crate::cli::printer::paint;
use crate::error::{CwcError, Result};

/// Typed by the user to leave the interactive loop
pub const EXIT_COMMAND: &str = "/exit";

const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful coding assistant.";

/// Build the system message, appending piped context when there is any.
pub fn system_message(custom: Option<&str>, context: Option<&str>) -> String {
    let base = custom.unwrap_or(DEFAULT_SYSTEM_MESSAGE);
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "{} Below you will find relevant context to answer the user's question.\n\nContext:\n{}\n\nPlease follow the users instructions, you can do this!",
            base, context
        ),
        None => base.to_string(),
    }
}

/// Run a single turn and wait for it.
pub async fn run_non_interactive(chat: &Chat, prompt: Option<String>) -> Result<()> {
    let prompt = prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or(CwcError::NoPrompt)?;

    let conversation = chat.begin_conversation(prompt).await?;
    conversation.wait_my_turn().await;
    Ok(())
}

fn read_user_input(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_user_prompt(out: &mut impl Write, color: bool) -> Result<()> {
    paint(out, color.then_some(Color::Green), "👤: ")?;
    Ok(())
}

/// Read prompts from `input` until `/exit` or end of input.
pub async fn run_interactive(
    chat: &Chat,
    prompt: Option<String>,
    input: &mut impl BufRead,
    out: &mut impl Write,
    color: bool,
) -> Result<()> {
    paint(
        out,
        color.then_some(Color::DarkGrey),
        &format!("Type '{}' to end the chat.\n", EXIT_COMMAND),
    )?;

    let first = match prompt.filter(|p| !p.trim().is_empty()) {
        Some(prompt) => {
            writeln!(out, "👤: {}", prompt)?;
            prompt
        }
        None => loop {
            print_user_prompt(out, color)?;
            match read_user_input(input)? {
                None => return Ok(()),
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
            }
        },
    };

    if first == EXIT_COMMAND {
        return Ok(());
    }

    let conversation = chat.begin_conversation(first).await?;

    loop {
        conversation.wait_my_turn().await;

        print_user_prompt(out, color)?;
        let Some(line) = read_user_input(input)? else {
            break;
        };
        if line == EXIT_COMMAND {
            break;
        }
        if line.is_empty() {
            continue;
        }
        conversation.reply(line).await?;
    }

    tracing::debug!(
        target: "cwc.cli",
        messages = conversation.history().len(),
        "interactive session ended"
    );
    Ok(())
}

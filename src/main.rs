// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! cwc - chat with a language model about your code
//!
//! Entry point for the cwc CLI application.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use clap::Parser;

use cwc::chat::Chat;
use cwc::cli::{self, ChunkPrinter, Cli};
use cwc::config::Settings;
use cwc::error::Result;
use cwc::llm::providers::OpenAiProvider;
use cwc::tools::Toolkit;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with streamed answers
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    if cli.verbose > 0 {
        for directive in [
            "cwc.chat.session=debug",
            "cwc.chat.turn=debug",
            "cwc.tools.dispatcher=debug",
            "cwc.tools.shell=debug",
            "cwc.llm.openai=debug",
        ] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    cli.apply_overrides(&mut settings);

    let api_key = cli.api_key(&settings);
    settings.validate(api_key.as_deref())?;

    let mut provider = OpenAiProvider::with_base_url(
        api_key.unwrap_or_default(),
        settings.provider.model.clone(),
        settings.provider.base_url.clone(),
    );
    if let Some(version) = &settings.provider.api_version {
        provider = provider.with_api_version(version.clone());
    }

    let piped = !io::stdin().is_terminal();
    let context = if piped {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let toolkit = Toolkit::from_config_files(&cli.enabled_tools(&settings))
        .with_timeout(settings.tool_timeout());

    let chat = Chat::new(
        Arc::new(provider),
        cli::system_message(cli.system.as_deref(), context.as_deref()),
        ChunkPrinter::stdout(),
    )
    .use_toolkit(&toolkit)
    .with_max_tool_rounds(settings.session.max_tool_rounds);

    if piped {
        cli::run_non_interactive(&chat, cli.prompt.clone()).await
    } else {
        let color = io::stdout().is_terminal();
        cli::run_interactive(
            &chat,
            cli.prompt.clone(),
            &mut io::stdin().lock(),
            &mut io::stdout(),
            color,
        )
        .await
    }
}

//! Terminal chat loop.
//!
//! History lives in memory for the duration of one run. A turn that fails
//! prints `Error: ...` and leaves the history untouched.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::completion::{ChatMessage, CompletionClient, CompletionOptions, CompletionService};
use crate::config::Config;
use crate::error::PipelineResult;
use crate::prompt::{chat_system_prompt, Persona};

pub struct ChatSession {
    system: ChatMessage,
    history: Vec<ChatMessage>,
    options: CompletionOptions,
}

impl ChatSession {
    pub fn new(persona: Persona, markdown: bool) -> Self {
        Self {
            system: ChatMessage::system(chat_system_prompt(persona, markdown)),
            history: Vec::new(),
            options: CompletionOptions::streaming(),
        }
    }

    /// Completed user/assistant exchanges, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Send one user message with the full history and record the exchange
    /// if it succeeds.
    pub async fn send(
        &mut self,
        service: &dyn CompletionService,
        input: &str,
    ) -> PipelineResult<String> {
        let user = ChatMessage::user(input);
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(self.system.clone());
        messages.extend(self.history.iter().cloned());
        messages.push(user.clone());

        let reply = service.chat(&messages, &self.options).await?;
        self.history.push(user);
        self.history.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Read lines from `reader` until `exit`, `quit`, or end of input.
pub async fn run_terminal_chat<R: BufRead, W: Write>(
    service: &dyn CompletionService,
    persona: Persona,
    markdown: bool,
    mut reader: R,
    mut writer: W,
) -> Result<()> {
    let mut session = ChatSession::new(persona, markdown);
    writeln!(writer, "Terminal chat. Type 'exit' to quit.\n")?;

    loop {
        write!(writer, "You: ")?;
        writer.flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if is_exit(input) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match session.send(service, input).await {
            Ok(reply) => writeln!(writer, "Assistant: {}\n", reply)?,
            Err(e) => {
                tracing::warn!(error = %e, "chat turn failed");
                writeln!(writer, "Error: {}\n", e)?
            }
        }
    }

    tracing::debug!(turns = session.history().len() / 2, "chat ended");
    Ok(())
}

/// `pdfqa chat`: interactive loop on stdin/stdout.
pub async fn run_chat(config: &Config, persona: Persona, markdown: bool) -> Result<()> {
    let client = CompletionClient::new(&config.completion)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_terminal_chat(&client, persona, markdown, stdin.lock(), stdout.lock()).await
}

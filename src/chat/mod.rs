// Session chat
// One conversation per terminal session, with the QA chain built on first use


use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use console::style;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use tracing::{debug, info};

use crate::Result;
use crate::qa::RetrievalQa;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Bot => "Bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    #[inline]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

type ChainFactory = Box<dyn FnMut() -> Result<RetrievalQa> + Send>;

/// Ordered message history plus a lazily built QA chain.
///
/// The chain is built by the first submitted message. A failed build is
/// reported as the bot's reply and attempted again on the next message.
pub struct ChatSession {
    factory: ChainFactory,
    chain: Option<RetrievalQa>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    #[inline]
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> Result<RetrievalQa> + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
            chain: None,
            messages: Vec::new(),
        }
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[inline]
    pub fn is_chain_ready(&self) -> bool {
        self.chain.is_some()
    }

    /// Ask the chain and record both sides of the exchange.
    ///
    /// Blank input is ignored and returns `None`; otherwise the bot's reply,
    /// which carries the error text when the chain could not answer.
    #[inline]
    pub fn submit(&mut self, input: &str) -> Option<&ChatMessage> {
        let question = input.trim();
        if question.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::new(Role::User, question));

        let reply = match self.chain().and_then(|chain| chain.ask(question)) {
            Ok(response) => response.result,
            Err(e) => {
                info!("Chat turn failed: {}", e);
                format!("Error: {}", e)
            }
        };

        self.messages.push(ChatMessage::new(Role::Bot, reply));
        self.messages.last()
    }

    /// Whole conversation, oldest first, one `[time] Role: text` entry per message
    #[inline]
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                message.timestamp.format("%H:%M:%S"),
                message.role.label(),
                message.content
            );
        }
        out
    }

    fn chain(&mut self) -> Result<&RetrievalQa> {
        let chain = match self.chain.take() {
            Some(chain) => chain,
            None => {
                debug!("Building QA chain for chat session");
                (self.factory)()?
            }
        };
        Ok(self.chain.insert(chain))
    }
}

/// Read questions from the terminal until `exit`, `quit` or end of input
#[inline]
pub fn run_terminal_chat(session: &mut ChatSession) -> anyhow::Result<()> {
    let theme = ColorfulTheme::default();

    eprintln!("{}", style("🩺 Medical Bot").bold().cyan());
    eprintln!("Ask a medical question. Type 'exit' or 'quit' to leave.");
    eprintln!();

    loop {
        let input: String = match Input::with_theme(&theme)
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(input) => input,
            Err(e) => {
                debug!("Input closed: {}", e);
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some(reply) = session.submit(trimmed) {
            println!("{} {}", style("Bot:").bold().green(), reply.content);
            println!();
        }
    }

    if !session.messages().is_empty() {
        eprintln!("{}", style("Transcript").bold().yellow());
        eprint!("{}", session.transcript());
    }

    Ok(())
}

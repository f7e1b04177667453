//! Conversation session
//!
//! Mediates the two kinds of requests to the chat service:
//! 1. Routine generation from the current selection
//! 2. Free-text turns that carry the whole conversation log as context
//!
//! Both share one failure policy. A failed call or a reply without text shows
//! the fallback message, and the conversation log only ever receives assistant
//! turns that the service actually produced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::Product;
use crate::config::prompts_builtin;
use crate::providers::ChatService;

use super::{Conversation, Message};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Select at least one product before generating a routine")]
    PreconditionNotMet,
}

/// Who a display entry is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One line of the chat window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub sender: Sender,
    pub text: String,
}

/// Result of a request that reached the chat service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum Outcome {
    Replied(String),
    /// The fallback message was shown instead
    Fallback,
}

/// Turn history and chat window. Locked only around reads and appends.
struct Transcript {
    conversation: Conversation,
    display: Vec<DisplayEntry>,
}

impl Transcript {
    fn show(&mut self, sender: Sender, text: &str) {
        self.display.push(DisplayEntry {
            sender,
            text: text.to_string(),
        });
    }
}

pub struct ConversationSession {
    chat: Arc<dyn ChatService>,
    routine_instruction: String,
    id: Uuid,
    transcript: Mutex<Transcript>,
}

impl ConversationSession {
    pub fn new(
        chat: Arc<dyn ChatService>,
        routine_instruction: impl Into<String>,
        chat_system: &str,
    ) -> Self {
        let conversation = Conversation::new().with_system(chat_system);
        Self {
            chat,
            routine_instruction: routine_instruction.into(),
            id: conversation.id,
            transcript: Mutex::new(Transcript {
                conversation,
                display: Vec::new(),
            }),
        }
    }

    pub async fn display_log(&self) -> Vec<DisplayEntry> {
        self.transcript.lock().await.display.clone()
    }

    #[cfg(test)]
    pub(crate) async fn conversation(&self) -> Conversation {
        self.transcript.lock().await.conversation.clone()
    }

    /// Ask for a routine built from `selection`
    pub async fn generate_routine(&self, selection: &[Product]) -> Result<Outcome, SessionError> {
        if selection.is_empty() {
            self.transcript
                .lock()
                .await
                .show(Sender::Bot, prompts_builtin::ADVISORY_EMPTY_SELECTION);
            return Err(SessionError::PreconditionNotMet);
        }

        let request = vec![
            Message::system(self.routine_instruction.clone()),
            Message::user(render_selection(selection)),
        ];

        tracing::info!(
            conversation = %self.id,
            "Generating routine for {} product(s)",
            selection.len()
        );

        Ok(self.exchange(&request).await)
    }

    /// Send a free-text message. Blank input is ignored and returns `None`.
    pub async fn send_message(&self, text: &str) -> Option<Outcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let context = {
            let mut transcript = self.transcript.lock().await;
            transcript.show(Sender::User, text);
            transcript.conversation.add_user(text);
            transcript.conversation.messages().to_vec()
        };

        tracing::debug!(
            conversation = %self.id,
            "Sending chat turn with {} message(s) of context",
            context.len()
        );

        Some(self.exchange(&context).await)
    }

    /// One round trip. The transcript is unlocked while the service answers.
    /// A reply is shown and logged as an assistant turn; any failure shows the
    /// fallback and leaves the log alone.
    async fn exchange(&self, messages: &[Message]) -> Outcome {
        let result = self.chat.complete(messages).await;

        let mut transcript = self.transcript.lock().await;
        match result {
            Ok(Some(reply)) => {
                transcript.show(Sender::Bot, &reply);
                transcript.conversation.add_assistant(&reply);
                Outcome::Replied(reply)
            }
            Ok(None) => {
                tracing::warn!(conversation = %self.id, "Chat service returned no reply text");
                transcript.show(Sender::Bot, prompts_builtin::FALLBACK_REPLY);
                Outcome::Fallback
            }
            Err(e) => {
                tracing::warn!(conversation = %self.id, "Chat request failed: {}", e);
                transcript.show(Sender::Bot, prompts_builtin::FALLBACK_REPLY);
                Outcome::Fallback
            }
        }
    }
}

/// Describe the selected products for the routine request
pub fn render_selection(selection: &[Product]) -> String {
    let items = selection
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. {} by {}\n   Category: {}\n   Description: {}",
                i + 1,
                p.name,
                p.brand,
                p.category,
                p.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Here are the products I selected:\n\n{}\n\nPlease build a routine with them.", items)
}

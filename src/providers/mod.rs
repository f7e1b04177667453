//! Remote chat service integration

mod openai_compat;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Message;

pub use openai_compat::{ChatEndpointConfig, HttpChatService};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Remote service failure: {0}")]
    RemoteServiceFailure(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::RemoteServiceFailure(err.to_string())
    }
}

/// A chat-completion endpoint
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send the ordered turns and return the assistant's text.
    ///
    /// `Ok(None)` means the service answered but the reply carried no text.
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>, ChatError>;
}

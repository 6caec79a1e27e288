//! Generative model collaborator
//!
//! The worker only needs text back for an instruction. Anything that can
//! answer one is a `GenerativeModel`.

mod chat;

pub use chat::ChatCompletionsModel;

use async_trait::async_trait;
use thiserror::Error;

use crate::instruction::Instruction;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Unavailable(String),

    #[error("model request timed out")]
    Timeout,

    #[error("model answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable model response: {0}")]
    BadResponse(String),
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the model's raw text answer
    async fn generate(&self, instruction: &Instruction) -> Result<String, ModelError>;
}

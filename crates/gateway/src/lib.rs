pub mod client;
pub mod gateway;
pub mod parse;
pub mod prompt;

use thiserror::Error;

pub use client::{CompletionClient, HttpCompletionClient};
pub use gateway::{CompletionGateway, LanguageModelGateway};

/// Failures talking to, or interpreting, the completion service. The
/// gateway never retries; the workflow engine maps these into its
/// per-stage fallbacks.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion request timed out after {0}s")]
    Timeout(u64),
    #[error("completion endpoint returned status {0}")]
    Status(u16),
    #[error("unusable completion reply: {0}")]
    UnusableReply(String),
}

//! Text-completion transport SPI.
//!
//! The app shell owns HTTP, auth and vendor protocols; core only needs an
//! opaque "send this prompt, give me the text back" capability.

use crate::ai::error::AiResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque prompt-in, text-out capability implemented outside core.
///
/// Implementations map transport/HTTP failures to `AiError::BadResponse`
/// and must not retry on their own.
#[async_trait]
pub trait PromptTransport: Send + Sync {
    async fn send_prompt(&self, prompt: &str) -> AiResult<String>;
}

#[async_trait]
impl<T: PromptTransport + ?Sized> PromptTransport for Arc<T> {
    async fn send_prompt(&self, prompt: &str) -> AiResult<String> {
        (**self).send_prompt(prompt).await
    }
}

#[async_trait]
impl<T: PromptTransport + ?Sized> PromptTransport for &T {
    async fn send_prompt(&self, prompt: &str) -> AiResult<String> {
        (**self).send_prompt(prompt).await
    }
}

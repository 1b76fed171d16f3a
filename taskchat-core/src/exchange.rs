//! One prompt out, one reply back.

use crate::error::{self, Error, Result};
use crate::provider::LlmProvider;
use tracing::debug;

/// A completed prompt/reply pair. Lives only as long as the caller keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatExchange {
    pub prompt: String,
    pub reply: String,
}

/// Send `prompt` as a single user message and return the first completion's
/// text. Exactly one request is issued; failures are not retried.
pub async fn ask<P: LlmProvider>(provider: &P, prompt: &str) -> Result<ChatExchange> {
    if prompt.is_empty() {
        return Err(Error::invalid_argument("prompt must not be empty")
            .with_operation("exchange::ask"));
    }

    debug!(provider = provider.name(), model = provider.default_model(), "asking");
    let reply = provider.prompt(prompt).await.map_err(|e| {
        error::provider_error(e)
            .with_operation("exchange::ask")
            .with_context("model", provider.default_model())
    })?;

    Ok(ChatExchange {
        prompt: prompt.to_string(),
        reply,
    })
}

//! Core error helpers
//!
//! Re-exports taskchat-error and adds the conversions the core needs.

pub use taskchat_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

/// Wrap a provider failure, keeping the original as the source.
pub fn provider_error(err: ProviderError) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::Parse(_) => ErrorKind::ParseFailed,
        ProviderError::Api { .. } | ProviderError::EmptyResponse => ErrorKind::InferenceFailed,
    };
    let mut wrapped = Error::new(kind, err.to_string());
    if let ProviderError::Api { status, .. } = &err {
        wrapped = wrapped.with_context("http_status", status.to_string());
    }
    wrapped.set_source(err)
}

/// Create an InvalidTask error
pub fn invalid_task(index: usize, reason: impl Into<String>) -> Error {
    Error::invalid_task(index, reason)
}

/// Create a SpawnFailed error from the io error returned by `spawn`
pub fn spawn_failed(program: &str, err: std::io::Error) -> Error {
    let reason = match err.kind() {
        std::io::ErrorKind::NotFound => format!("command not found: {}", program),
        std::io::ErrorKind::PermissionDenied => format!("permission denied: {}", program),
        _ => format!("failed to start {}: {}", program, err),
    };
    Error::spawn_failed(program, reason).set_source(err)
}

use crate::model::TraceBatch;
use async_trait::async_trait;
use thiserror::Error;

/// Metadata key under which the access token travels with a batch.
pub const ACCESS_TOKEN_METADATA_KEY: &str = "lightstep-access-token";

/// Request-scoped values passed alongside a batch to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    access_token: String,
}

impl RequestMetadata {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        (key == ACCESS_TOKEN_METADATA_KEY).then_some(self.access_token.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Downstream consumer of translated batches.
///
/// The sink owns each batch it receives. It may be arbitrarily slow; callers
/// impose no timeout of their own.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn consume(&self, batch: TraceBatch, metadata: RequestMetadata) -> Result<(), SinkError>;
}

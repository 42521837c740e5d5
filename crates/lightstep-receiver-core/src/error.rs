use crate::model::ProjectTraceBatch;
use crate::sink::SinkError;
use std::fmt;
use thiserror::Error;

/// Fatal translation errors; the report is rejected and never reaches the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("missing auth token")]
    MissingAccessToken,

    #[error("missing service.name (lightstep.component_name)")]
    MissingServiceName,
}

/// A rejected report together with whatever was resolved before the failure,
/// so callers can still log the service it claimed to come from.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TransformFailure {
    #[source]
    pub error: TransformError,
    pub partial: Box<ProjectTraceBatch>,
}

impl TransformFailure {
    pub fn new(error: TransformError, partial: ProjectTraceBatch) -> Self {
        Self {
            error,
            partial: Box::new(partial),
        }
    }
}

/// Recoverable: the listed keys were dropped, every other key was kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attribute is not UTF8 string")]
pub struct NonUtf8AttributeError {
    pub keys: Vec<String>,
}

/// Every way a single ingestion request can fail after it was accepted by a
/// listener.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Transform(#[from] TransformFailure),

    #[error("malformed {format} report: {message}")]
    MalformedInput {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl IngestError {
    pub fn malformed(format: &'static str, error: impl fmt::Display) -> Self {
        IngestError::MalformedInput {
            format,
            message: error.to_string(),
        }
    }

    /// The transform error behind this failure, if it was one.
    pub fn transform_error(&self) -> Option<TransformError> {
        match self {
            IngestError::Transform(failure) => Some(failure.error),
            _ => None,
        }
    }
}

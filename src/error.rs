// src/error.rs
//! Error types at the component seams. Per-item errors (translate, deliver) are
//! recovered by the pipeline; `RunError` aborts a single run.

use thiserror::Error;

/// Upstream response bodies kept in errors are cut to this many chars.
pub const MAX_ERROR_BODY: usize = 512;

/// `body` cut to `MAX_ERROR_BODY` chars, with a marker when anything was dropped.
pub fn bounded_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((i, _)) => format!("{}... [truncated]", &body[..i]),
        None => body.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("feed parse error: {0}")]
    Parse(#[from] quick_xml::de::DeError),
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation credentials are not configured")]
    MissingCredentials,

    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation API error: status {status}, body: {body}")]
    Api { status: u16, body: String },

    #[error("empty translations in response: {0}")]
    EmptyResponse(String),

    #[error("chunk {} of {total} failed: {source}", .index + 1)]
    Chunk {
        index: usize,
        total: usize,
        #[source]
        source: Box<TranslateError>,
    },
}

impl TranslateError {
    /// True when the failure is a setup problem rather than a service hiccup.
    pub fn is_configuration(&self) -> bool {
        match self {
            TranslateError::MissingCredentials => true,
            TranslateError::Chunk { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery API error: status {status}, body: {body}")]
    Api { status: u16, body: String },

    #[error("delivery rejected: {0}")]
    Rejected(String),

    #[error("segment {} of {total} failed: {source}", .index + 1)]
    Segment {
        index: usize,
        total: usize,
        #[source]
        source: Box<DeliveryError>,
    },
}

impl DeliveryError {
    /// Zero-based index of the failing segment, if the error came from a split delivery.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            DeliveryError::Segment { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that abort a whole pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("error fetching feed: {0}")]
    Fetch(#[from] FeedError),

    #[error("feed contained no items")]
    EmptyFeed,

    #[error("error reading checkpoint: {0}")]
    CheckpointRead(#[source] CheckpointError),

    #[error("error saving checkpoint: {0}")]
    CheckpointWrite(#[source] CheckpointError),
}

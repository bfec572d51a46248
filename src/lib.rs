// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod summarize;
pub mod telemetry;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::checkpoint::{fingerprint, Checkpoint, CheckpointStore};
pub use crate::config::{Config, RelaySettings, Secrets};
pub use crate::error::{CheckpointError, DeliveryError, FeedError, RunError, TranslateError};
pub use crate::ingest::{FeedItem, FeedSource};
pub use crate::notify::{Delivery, SegmentSink, SegmentedDelivery};
pub use crate::pipeline::{DeliveryOutcome, Pipeline, PipelineSettings, RunReport, StopReason};
pub use crate::translate::{ChunkedTranslator, TranslateProvider, Translator};

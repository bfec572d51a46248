//! Outbound delivery: a segment sink (one API call) and a splitter that keeps
//! every call under the destination's message limit.

pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::error::DeliveryError;

pub use telegram::TelegramSender;

/// Telegram's hard cap on `sendMessage` text.
pub const TELEGRAM_MAX_TEXT: usize = 4096;
/// Headroom kept below the cap for markup expansion.
pub const DEFAULT_MARGIN: usize = 100;
pub const DEFAULT_SEGMENT_DELAY: Duration = Duration::from_millis(500);

/// What the pipeline calls: one formatted message, any length.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError>;
}

pub type DynDelivery = Arc<dyn Delivery>;

/// One remote call carrying text that already fits the limit.
#[async_trait]
pub trait SegmentSink: Send + Sync {
    async fn send_segment(&self, text: &str) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

/// Split `message` into consecutive segments of at most `max_len` chars.
pub fn split_segments(message: &str, max_len: usize) -> Vec<&str> {
    crate::translate::split_chunks(message, max_len)
}

pub struct SegmentedDelivery<S: SegmentSink> {
    sink: S,
    segment_len: usize,
    pacing: Duration,
}

impl<S: SegmentSink> SegmentedDelivery<S> {
    /// `max_len` is the hard limit; segments are cut at `max_len - margin`.
    pub fn new(sink: S, max_len: usize, margin: usize) -> Self {
        Self {
            sink,
            segment_len: max_len.saturating_sub(margin).max(1),
            pacing: DEFAULT_SEGMENT_DELAY,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[async_trait]
impl<S: SegmentSink> Delivery for SegmentedDelivery<S> {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        let segments = split_segments(message, self.segment_len);
        let total = segments.len();

        for (index, segment) in segments.into_iter().enumerate() {
            if let Err(e) = self.sink.send_segment(segment).await {
                tracing::error!(
                    sink = self.sink.name(),
                    error = %e,
                    part = index + 1,
                    total_parts = total,
                    part_length = segment.chars().count(),
                    "segment delivery failed"
                );
                return Err(DeliveryError::Segment {
                    index,
                    total,
                    source: Box::new(e),
                });
            }
            counter!("relay_delivery_segments_total").increment(1);

            if index + 1 < total && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }
        Ok(())
    }
}

// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use news_relay::checkpoint::CheckpointStore;
use news_relay::error::{DeliveryError, FeedError, TranslateError};
use news_relay::ingest::{FeedItem, FeedSource};
use news_relay::notify::{Delivery, SegmentSink};
use news_relay::pipeline::{Pipeline, PipelineSettings};
use news_relay::translate::Translator;
use tokio::sync::watch;

pub fn item(n: usize) -> FeedItem {
    FeedItem::new(
        format!("Headline {n}"),
        format!("https://news.example.com/articles/{n}"),
        format!("<p>Body of article {n}. It has two sentences.</p>"),
        "Tue, 14 Oct 2025 10:00:00 GMT",
    )
}

pub fn items(n: usize) -> Vec<FeedItem> {
    (0..n).map(item).collect()
}

pub fn settings(max_articles: usize) -> PipelineSettings {
    PipelineSettings {
        max_articles,
        summary_max_len: 1000,
        summary_sentences: 5,
        item_delay: Duration::ZERO,
        notify_failures: true,
    }
}

pub struct StaticFeed {
    items: Mutex<Vec<FeedItem>>,
    pub fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new(items: Vec<FeedItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, items: Vec<FeedItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub struct DownFeed;

#[async_trait]
impl FeedSource for DownFeed {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        Err(FeedError::Status {
            status: 503,
            body: "Service Unavailable".into(),
        })
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// Upstream answering with a large error page.
pub struct OutageFeed {
    pub page: String,
}

#[async_trait]
impl FeedSource for OutageFeed {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        Err(FeedError::Status {
            status: 503,
            body: self.page.clone(),
        })
    }

    fn name(&self) -> &str {
        "outage"
    }
}

#[derive(Default)]
pub struct CountingSink {
    pub segments: Mutex<Vec<String>>,
}

#[async_trait]
impl SegmentSink for CountingSink {
    async fn send_segment(&self, text: &str) -> Result<(), DeliveryError> {
        self.segments.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Returns the input unchanged, failing for inputs that contain `fail_on`.
#[derive(Default)]
pub struct EchoTranslator {
    pub calls: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
    pub expand_to: Option<String>,
}

impl EchoTranslator {
    pub fn failing_on(needle: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(needle.to_string()),
            ..Default::default()
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(TranslateError::Api {
                    status: 429,
                    body: "rate limited".into(),
                });
            }
        }
        Ok(self.expand_to.clone().unwrap_or_else(|| text.to_string()))
    }
}

/// Records delivered messages; fails for messages that contain `fail_on`.
/// Optionally flips a shutdown flag after each successful delivery.
#[derive(Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
    pub shutdown_after_send: Option<watch::Sender<bool>>,
}

impl RecordingDelivery {
    pub fn failing_on(needle: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(needle.to_string()),
            ..Default::default()
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        if let Some(needle) = &self.fail_on {
            if message.contains(needle.as_str()) {
                return Err(DeliveryError::Segment {
                    index: 0,
                    total: 1,
                    source: Box::new(DeliveryError::Rejected("Forbidden".into())),
                });
            }
        }
        self.sent.lock().unwrap().push(message.to_string());
        if let Some(tx) = &self.shutdown_after_send {
            let _ = tx.send(true);
        }
        Ok(())
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: CheckpointStore,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("last_post.json"));
        Self { dir, store }
    }

    pub fn pipeline(
        &self,
        feed: Arc<dyn FeedSource>,
        translator: Arc<dyn Translator>,
        delivery: Arc<dyn Delivery>,
        settings: PipelineSettings,
    ) -> Pipeline {
        Pipeline::new(feed, translator, delivery, self.store.clone(), settings)
    }
}

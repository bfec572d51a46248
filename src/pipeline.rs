// src/pipeline.rs
//! New-item detection and delivery.
//!
//! One run: fetch → diff against the checkpoint → per new item normalize, translate,
//! summarize, format, deliver. The newest item's identifier is written to the checkpoint
//! as soon as it is known to be new, before its delivery is attempted. A crash between
//! that write and delivery skips the item on restart instead of redelivering it forever.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::checkpoint::{fingerprint, CheckpointStore};
use crate::config::{Config, RelaySettings};
use crate::error::RunError;
use crate::ingest::rss::RssFeedSource;
use crate::ingest::{is_valid_link, normalize_content, FeedItem, FeedSource};
use crate::notify::{DynDelivery, SegmentedDelivery, TelegramSender};
use crate::summarize::summarize;
use crate::telemetry::ensure_metrics_described;
use crate::translate::{ChunkedTranslator, DynTranslator, YandexTranslator};

/// Error text in a failure notice is cut to this many chars; escaped, it stays one segment.
pub const NOTICE_MAX_CHARS: usize = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryOutcome {
    Delivered,
    TranslationFailed,
    DeliveryFailed,
    SkippedInvalidLink,
    SkippedEmptyContent,
    SkippedDuplicate,
}

impl DeliveryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::TranslationFailed => "translation-failed",
            DeliveryOutcome::DeliveryFailed => "delivery-failed",
            DeliveryOutcome::SkippedInvalidLink => "skipped-invalid-link",
            DeliveryOutcome::SkippedEmptyContent => "skipped-empty-content",
            DeliveryOutcome::SkippedDuplicate => "skipped-duplicate",
        }
    }
}

/// Which field the translated content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSource {
    Body,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    ReachedCheckpoint,
    CapReached,
    Exhausted,
    Cancelled,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::ReachedCheckpoint => "reached-checkpoint",
            StopReason::CapReached => "cap-reached",
            StopReason::Exhausted => "exhausted",
            StopReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub link: String,
    pub outcome: DeliveryOutcome,
    pub content_source: Option<ContentSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub items: Vec<ItemReport>,
    pub stop: StopReason,
}

impl RunReport {
    pub fn delivered(&self) -> usize {
        self.count(DeliveryOutcome::Delivered)
    }

    pub fn count(&self, outcome: DeliveryOutcome) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_articles: usize,
    pub summary_max_len: usize,
    pub summary_sentences: usize,
    /// Pause before each translation request.
    pub item_delay: Duration,
    pub notify_failures: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

impl From<&RelaySettings> for PipelineSettings {
    fn from(s: &RelaySettings) -> Self {
        Self {
            max_articles: s.max_articles,
            summary_max_len: s.summary_max_len,
            summary_sentences: s.summary_sentences,
            item_delay: s.item_delay(),
            notify_failures: s.notify_failures,
        }
    }
}

pub struct Pipeline {
    source: Arc<dyn FeedSource>,
    translator: DynTranslator,
    delivery: DynDelivery,
    checkpoints: CheckpointStore,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn FeedSource>,
        translator: DynTranslator,
        delivery: DynDelivery,
        checkpoints: CheckpointStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            translator,
            delivery,
            checkpoints,
            settings,
        }
    }

    /// Wire the production components. One client is shared by all three remotes;
    /// `shutdown` also cuts feed fetch retries short.
    pub fn from_config(
        cfg: &Config,
        client: reqwest::Client,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let s = &cfg.settings;
        let source = RssFeedSource::from_url(&s.feed_url, client.clone())
            .with_retries(s.fetch_retries, s.fetch_retry_delay())
            .with_shutdown(shutdown);
        let translator = ChunkedTranslator::new(
            YandexTranslator::new(
                client.clone(),
                &cfg.secrets.yandex_api_key,
                &cfg.secrets.yandex_folder_id,
                &s.target_language,
            ),
            s.translate_max_chunk,
        );
        let delivery = SegmentedDelivery::new(
            TelegramSender::new(
                client,
                &cfg.secrets.telegram_token,
                &cfg.secrets.telegram_chat_id,
            ),
            s.delivery_max_len,
            s.delivery_margin,
        )
        .with_pacing(s.segment_delay());

        Self::new(
            Arc::new(source),
            Arc::new(translator),
            Arc::new(delivery),
            CheckpointStore::new(&s.checkpoint_path),
            PipelineSettings::from(s),
        )
    }

    pub async fn run_once(&self) -> Result<RunReport, RunError> {
        self.run(None).await
    }

    /// Like `run_once`, but stops between items once `shutdown` flips to true.
    pub async fn run_once_with_shutdown(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<RunReport, RunError> {
        self.run(Some(shutdown)).await
    }

    async fn run(&self, shutdown: Option<&watch::Receiver<bool>>) -> Result<RunReport, RunError> {
        ensure_metrics_described();
        counter!("relay_runs_total").increment(1);
        let t0 = Instant::now();

        let result = self.run_inner(shutdown).await;

        histogram!("relay_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("relay_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        if result.is_err() {
            counter!("relay_run_failures_total").increment(1);
        }
        result
    }

    async fn run_inner(
        &self,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<RunReport, RunError> {
        let items = self.source.fetch().await?;
        if items.is_empty() {
            warn!(source = self.source.name(), "no articles found in feed");
            return Err(RunError::EmptyFeed);
        }

        let checkpoint = self.checkpoints.load().map_err(RunError::CheckpointRead)?;

        let mut report = RunReport {
            fetched: items.len(),
            items: Vec::new(),
            stop: StopReason::Exhausted,
        };
        let mut delivered = 0usize;
        let mut seen: HashSet<String> = HashSet::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            if delivered >= self.settings.max_articles {
                debug!(max = self.settings.max_articles, "reached maximum articles to send");
                report.stop = StopReason::CapReached;
                break;
            }
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                info!(index, "shutdown requested, abandoning remaining articles");
                report.stop = StopReason::Cancelled;
                break;
            }

            let fp = fingerprint(&item.id);
            debug!(
                index,
                url = %item.link,
                current_hash = %fp,
                last_hash = %checkpoint.hash,
                "processing article"
            );

            if checkpoint.matches(&fp) {
                if index == 0 {
                    info!("no new articles found");
                } else {
                    debug!(url = %item.link, "found already processed article");
                }
                report.stop = StopReason::ReachedCheckpoint;
                break;
            }

            if index == 0 {
                self.checkpoints.save(&item.id).map_err(|e| {
                    error!(error = %e, url = %item.link, "failed to save checkpoint");
                    RunError::CheckpointWrite(e)
                })?;
            }

            let (outcome, content_source) = if seen.insert(fp) {
                self.process_item(item).await
            } else {
                warn!(url = %item.link, "duplicate article in feed, skipping");
                (DeliveryOutcome::SkippedDuplicate, None)
            };

            if outcome == DeliveryOutcome::Delivered {
                delivered += 1;
            }
            counter!("relay_items_total", "outcome" => outcome.as_str()).increment(1);
            report.items.push(ItemReport {
                id: item.id.clone(),
                link: item.link.clone(),
                outcome,
                content_source,
            });
        }

        info!(
            fetched = report.fetched,
            considered = report.items.len(),
            delivered,
            stop = report.stop.as_str(),
            "run finished"
        );
        Ok(report)
    }

    async fn process_item(&self, item: &FeedItem) -> (DeliveryOutcome, Option<ContentSource>) {
        if !is_valid_link(&item.link) {
            error!(url = %item.link, "invalid URL in article");
            return (DeliveryOutcome::SkippedInvalidLink, None);
        }

        let Some((content, source)) = select_content(item) else {
            error!(url = %item.link, "empty content for article");
            return (DeliveryOutcome::SkippedEmptyContent, None);
        };
        if source == ContentSource::Title {
            debug!(title = %item.title, "using title as content as description is empty");
        }
        debug!(
            length = content.chars().count(),
            sample = %preview(&content, 100),
            "content prepared for translation"
        );

        if !self.settings.item_delay.is_zero() {
            tokio::time::sleep(self.settings.item_delay).await;
        }

        let translation = match self.translator.translate(&content).await {
            Ok(t) => t,
            Err(e) => {
                error!(
                    error = %e,
                    configuration = e.is_configuration(),
                    url = %item.link,
                    content_length = content.chars().count(),
                    content_sample = %preview(&content, 200),
                    "translation error"
                );
                return (DeliveryOutcome::TranslationFailed, Some(source));
            }
        };

        let summary = summarize(
            &translation,
            self.settings.summary_max_len,
            self.settings.summary_sentences,
        );
        let message = format_message(item, &summary);

        if let Err(e) = self.delivery.deliver(&message).await {
            error!(
                error = %e,
                segment = ?e.segment_index(),
                url = %item.link,
                message_length = message.chars().count(),
                "error sending message"
            );
            return (DeliveryOutcome::DeliveryFailed, Some(source));
        }

        info!(
            title = %item.title,
            url = %item.link,
            translation_length = translation.chars().count(),
            "article processed successfully"
        );
        (DeliveryOutcome::Delivered, Some(source))
    }

    /// Best-effort notice about a failed run through the delivery channel.
    /// A failing notice is logged and dropped.
    pub async fn notify_failure(&self, err: &RunError) {
        if !self.settings.notify_failures {
            return;
        }
        let msg = format!(
            "🚨 News relay error:\n\n{}",
            html_escape::encode_text(&preview(&err.to_string(), NOTICE_MAX_CHARS))
        );
        if let Err(e) = self.delivery.deliver(&msg).await {
            error!(error = %e, "failed to send error notice");
        }
    }
}

/// Normalized body, or normalized title when the body is empty. `None` when both are empty.
pub fn select_content(item: &FeedItem) -> Option<(String, ContentSource)> {
    let body = normalize_content(&item.body);
    if !body.is_empty() {
        return Some((body, ContentSource::Body));
    }
    let title = normalize_content(&item.title);
    if !title.is_empty() {
        return Some((title, ContentSource::Title));
    }
    None
}

/// HTML message for Telegram: title, summary, date, link.
pub fn format_message(item: &FeedItem, summary: &str) -> String {
    format!(
        "<b>📌 {}</b>\n\n{}\n\n<b>📅 {}</b>\n🔗 <a href=\"{}\">Read full article</a>",
        html_escape::encode_text(&normalize_content(&item.title)),
        html_escape::encode_text(summary),
        html_escape::encode_text(&display_date(&item.published_at)),
        html_escape::encode_double_quoted_attribute(item.link.trim()),
    )
}

/// RFC 2822 dates become `YYYY-MM-DD HH:MM UTC`; anything else is shown as given.
pub fn display_date(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string(),
        Err(_) => normalize_content(raw),
    }
}

fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

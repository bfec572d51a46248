// src/ingest/rss.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use tokio::sync::watch;

use crate::error::{bounded_body, FeedError};
use crate::ingest::types::{FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Parse an RSS 2.0 document into feed items, keeping document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let t0 = Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean)?;

    let items: Vec<FeedItem> = rss
        .channel
        .item
        .into_iter()
        .map(|it| {
            FeedItem::new(
                it.title.unwrap_or_default(),
                it.link.unwrap_or_default(),
                it.description.unwrap_or_default(),
                it.pub_date.unwrap_or_default(),
            )
        })
        .collect();

    histogram!("relay_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

/// Polls a single RSS URL. The client is shared so connections are pooled across runs.
pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        retries: u32,
        retry_delay: Duration,
        shutdown: Option<watch::Receiver<bool>>,
    },
}

impl RssFeedSource {
    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
                retries: 0,
                retry_delay: Duration::ZERO,
                shutdown: None,
            },
        }
    }

    /// Bounded retry with a fixed delay, applied to the fetch step only.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        if let Mode::Http {
            retries: r,
            retry_delay: d,
            ..
        } = &mut self.mode
        {
            *r = retries;
            *d = delay;
        }
        self
    }

    /// Stop retrying once `shutdown` flips to true. A request already in flight still
    /// runs to completion or to the client timeout.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        if let Mode::Http { shutdown: s, .. } = &mut self.mode {
            *s = Some(shutdown);
        }
        self
    }

    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String, FeedError> {
        let resp = client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: bounded_body(&body),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        match &self.mode {
            Mode::Fixture(xml) => parse_feed(xml),
            Mode::Http {
                url,
                client,
                retries,
                retry_delay,
                shutdown,
            } => {
                let mut attempt: u32 = 0;
                loop {
                    let res = match Self::fetch_body(client, url).await {
                        Ok(body) => parse_feed(&body),
                        Err(e) => Err(e),
                    };
                    match res {
                        Ok(items) => return Ok(items),
                        Err(e) if attempt < *retries && !shutdown_requested(shutdown) => {
                            attempt += 1;
                            counter!("relay_fetch_retries_total").increment(1);
                            tracing::warn!(
                                error = %e,
                                attempt,
                                max = *retries,
                                url = %url,
                                "feed fetch failed, retrying"
                            );
                            if !sleep_unless_shutdown(*retry_delay, shutdown.as_ref()).await {
                                tracing::info!(url = %url, "shutdown requested, giving up feed fetch");
                                return Err(e);
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url,
        }
    }
}

fn shutdown_requested(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Sleeps for `delay`; returns false early if shutdown is requested meanwhile.
async fn sleep_unless_shutdown(delay: Duration, shutdown: Option<&watch::Receiver<bool>>) -> bool {
    let Some(rx) = shutdown else {
        tokio::time::sleep(delay).await;
        return true;
    };
    let mut rx = rx.clone();
    let stop = async {
        // A dropped sender never stops the wait.
        let closed = rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = stop => false,
    }
}

/// XML only knows five entities; feeds still ship HTML ones inside text nodes.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

// src/ingest/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// One entry of a single fetch. Feed order is newest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    /// Derived from the link; stable across title edits.
    pub id: String,
    pub title: String,
    pub body: String,
    pub published_at: String,
    pub link: String,
}

impl FeedItem {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        body: impl Into<String>,
        published_at: impl Into<String>,
    ) -> Self {
        let link = link.into();
        Self {
            id: identifier_for(&link),
            title: title.into(),
            body: body.into(),
            published_at: published_at.into(),
            link,
        }
    }
}

/// Canonical identifier for a link: surrounding whitespace removed.
pub fn identifier_for(link: &str) -> String {
    link.trim().to_string()
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;
    fn name(&self) -> &str;
}

//! Translation: provider abstraction plus a chunking wrapper that respects the
//! provider's per-call input limit.

pub mod yandex;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;

use crate::error::TranslateError;

pub use yandex::YandexTranslator;

/// Default per-call input limit of the translation API, in chars.
pub const DEFAULT_MAX_CHUNK: usize = 10_000;

/// What the pipeline calls: full text in, full translation out.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

pub type DynTranslator = Arc<dyn Translator>;

/// Low-level provider: one remote call for text that already fits the limit.
#[async_trait]
pub trait TranslateProvider: Send + Sync {
    async fn translate_chunk(&self, chunk: &str) -> Result<String, TranslateError>;

    /// Checked once before any chunk is sent.
    fn has_credentials(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// Split `text` into contiguous pieces of at most `max_chunk` chars.
/// Concatenating the pieces gives back `text` exactly.
pub fn split_chunks(text: &str, max_chunk: usize) -> Vec<&str> {
    let max_chunk = max_chunk.max(1);
    let mut out = Vec::with_capacity(text.len() / max_chunk + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max_chunk)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        out.push(head);
        rest = tail;
    }
    out
}

/// Sends chunks one at a time, in order, and stops at the first failure.
pub struct ChunkedTranslator<P: TranslateProvider> {
    inner: P,
    max_chunk: usize,
}

impl<P: TranslateProvider> ChunkedTranslator<P> {
    pub fn new(inner: P, max_chunk: usize) -> Self {
        Self {
            inner,
            max_chunk: max_chunk.max(1),
        }
    }
}

#[async_trait]
impl<P: TranslateProvider> Translator for ChunkedTranslator<P> {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        if !self.inner.has_credentials() {
            return Err(TranslateError::MissingCredentials);
        }
        if text.is_empty() {
            return Ok(String::new());
        }

        let chunks = split_chunks(text, self.max_chunk);
        let total = chunks.len();
        let mut out = String::with_capacity(text.len());

        for (index, chunk) in chunks.into_iter().enumerate() {
            tracing::debug!(
                provider = self.inner.name(),
                chunk = index + 1,
                total,
                len = chunk.chars().count(),
                "translating chunk"
            );
            counter!("relay_translate_chunks_total").increment(1);
            match self.inner.translate_chunk(chunk).await {
                Ok(translated) => out.push_str(&translated),
                Err(e) => {
                    return Err(TranslateError::Chunk {
                        index,
                        total,
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Echo {
        calls: Mutex<Vec<String>>,
        fail_at: Option<usize>,
        creds: bool,
    }

    impl Echo {
        fn new() -> Self {
            Self {
                calls: Mutex::new(vec![]),
                fail_at: None,
                creds: true,
            }
        }
    }

    #[async_trait]
    impl TranslateProvider for Echo {
        async fn translate_chunk(&self, chunk: &str) -> Result<String, TranslateError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(chunk.to_string());
            if self.fail_at == Some(calls.len() - 1) {
                return Err(TranslateError::Api {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(chunk.to_string())
        }

        fn has_credentials(&self) -> bool {
            self.creds
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    #[test]
    fn split_respects_limit_and_char_boundaries() {
        let text = "äöü".repeat(7);
        let chunks = split_chunks(&text, 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks.concat(), text);
        assert!(split_chunks("", 4).is_empty());
    }

    #[tokio::test]
    async fn identity_provider_round_trips_long_text() {
        let text: String = (0..250).map(|i| format!("word{i} ")).collect();
        let t = ChunkedTranslator::new(Echo::new(), 64);
        let out = t.translate(&text).await.unwrap();
        assert_eq!(out, text);
        let calls = t.inner.calls.lock().unwrap();
        assert_eq!(calls.len(), text.chars().count().div_ceil(64));
    }

    #[tokio::test]
    async fn stops_at_first_failing_chunk() {
        let mut echo = Echo::new();
        echo.fail_at = Some(1);
        let t = ChunkedTranslator::new(echo, 10);
        let err = t.translate(&"x".repeat(35)).await.unwrap_err();
        match err {
            TranslateError::Chunk { index, total, .. } => {
                assert_eq!(index, 1);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(t.inner.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let mut echo = Echo::new();
        echo.creds = false;
        let t = ChunkedTranslator::new(echo, 10);
        let err = t.translate("hello").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(t.inner.calls.lock().unwrap().is_empty());
    }
}

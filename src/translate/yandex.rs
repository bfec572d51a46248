// src/translate/yandex.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TranslateProvider;
use crate::error::{bounded_body, TranslateError};

pub const YANDEX_TRANSLATE_URL: &str =
    "https://translate.api.cloud.yandex.net/translate/v2/translate";

/// Yandex Cloud Translate v2. Authenticated with an API key scoped to a folder.
pub struct YandexTranslator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    folder_id: String,
    target_language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    folder_id: &'a str,
    texts: [&'a str; 1],
    target_language_code: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

impl YandexTranslator {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        folder_id: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: YANDEX_TRANSLATE_URL.to_string(),
            api_key: api_key.into(),
            folder_id: folder_id.into(),
            target_language: target_language.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body<'a>(&'a self, text: &'a str) -> TranslateRequest<'a> {
        TranslateRequest {
            folder_id: &self.folder_id,
            texts: [text],
            target_language_code: &self.target_language,
        }
    }
}

fn parse_response(body: &str) -> Result<String, TranslateError> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|_| TranslateError::EmptyResponse(bounded_body(body)))?;
    parsed
        .translations
        .into_iter()
        .next()
        .map(|t| t.text)
        .ok_or_else(|| TranslateError::EmptyResponse(bounded_body(body)))
}

#[async_trait]
impl TranslateProvider for YandexTranslator {
    async fn translate_chunk(&self, chunk: &str) -> Result<String, TranslateError> {
        if !self.has_credentials() {
            return Err(TranslateError::MissingCredentials);
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&self.request_body(chunk))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(status = status.as_u16(), len = body.len(), "yandex translate response");

        if !status.is_success() {
            return Err(TranslateError::Api {
                status: status.as_u16(),
                body: bounded_body(&body),
            });
        }
        parse_response(&body)
    }

    fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.folder_id.trim().is_empty()
    }

    fn name(&self) -> &'static str {
        "yandex"
    }
}

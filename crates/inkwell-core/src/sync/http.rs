//! reqwest implementation of the remote entry API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::remote::{RemoteEntryApi, RemoteError, RemoteResult};
use crate::models::{EntryFields, EntryType, RemoteEntry};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Entry API client rooted at `<base>/entries`.
#[derive(Clone)]
pub struct HttpEntryApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpEntryApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpEntryApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpEntryApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> RemoteResult<Self> {
        let base_url = normalize_endpoint(base_url.into())?;
        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/entries{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }

    async fn entries(&self, request: RequestBuilder) -> RemoteResult<Vec<RemoteEntry>> {
        let payload = self.send(request).await?.json::<EntryListResponse>().await?;
        Ok(payload.into_entries())
    }
}

impl RemoteEntryApi for HttpEntryApi {
    async fn create(&self, fields: &EntryFields) -> RemoteResult<i64> {
        let response = self
            .send(self.client.post(self.url("")).json(fields))
            .await?;
        let created = response.json::<CreatedResponse>().await?;
        created.id.ok_or_else(|| {
            RemoteError::InvalidPayload("create response did not include id".to_string())
        })
    }

    async fn update(&self, id: i64, fields: &EntryFields) -> RemoteResult<()> {
        self.send(self.client.patch(self.url(&format!("/{id}"))).json(fields))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> RemoteResult<()> {
        self.send(self.client.delete(self.url(&format!("/{id}"))))
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        entry_type: Option<EntryType>,
        limit: usize,
        offset: usize,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        let mut query = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(kind) = entry_type {
            query.push(("type", kind.as_str().to_string()));
        }
        self.entries(self.client.get(self.url("")).query(&query))
            .await
    }

    async fn search(&self, query: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.entries(self.client.get(self.url("/search")).query(&[("q", query)]))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: Option<i64>,
}

/// List endpoints answer with a bare array or an `{ "entries": [...] }` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntryListResponse {
    Bare(Vec<RemoteEntry>),
    Envelope { entries: Vec<RemoteEntry> },
}

impl EntryListResponse {
    fn into_entries(self) -> Vec<RemoteEntry> {
        match self {
            Self::Bare(entries) | Self::Envelope { entries } => entries,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
    } else {
        trimmed
    }
}

fn normalize_endpoint(raw: String) -> RemoteResult<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

use bv_core::{Article, ArticlePreview, Error, Result};
use bv_storage::SearchResult;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

/// Typed access to the REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        read_json(response).await
    }

    pub async fn daily_article(&self, date: Option<NaiveDate>) -> Result<Article> {
        let query: Vec<(&str, String)> = date
            .map(|d| vec![("date", d.format("%Y-%m-%d").to_string())])
            .unwrap_or_default();
        self.get_json("articles/daily", &query).await
    }

    pub async fn get_article(&self, id: &str) -> Result<Article> {
        self.get_json(&format!("articles/{}", id), &[]).await
    }

    pub async fn list_articles(&self, limit: usize, offset: usize) -> Result<Vec<ArticlePreview>> {
        self.get_json(
            "articles",
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let response: SearchResponse = self
            .get_json("search", &[("q", query.to_string()), ("limit", limit.to_string())])
            .await?;
        Ok(response.results)
    }

    pub async fn suggestions(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let response: SuggestionsResponse = self
            .get_json(
                "search/suggestions",
                &[("q", prefix.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(response.suggestions)
    }
}

/// API errors keep their meaning: 404, 409 and 400 map to the matching
/// `Error` variants, anything else stays an HTTP error.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    if !matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::CONFLICT | StatusCode::BAD_REQUEST
    ) {
        response.error_for_status()?;
        return Err(Error::Storage(format!("Unexpected status {}", status)));
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => status.to_string(),
    };
    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        _ => Error::Validation(vec![message]),
    })
}

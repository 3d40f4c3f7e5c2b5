use async_trait::async_trait;
use bv_core::{Result, ScrapedContent};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use super::{ContentSource, PageFetcher, SearchHit};

pub const ADVANCED_SEARCH_URL: &str = "https://archive.org/advancedsearch.php";
const FIELDS: [&str; 5] = ["identifier", "title", "description", "date", "mediatype"];
const CONTENT_ROOT: &str = ".item-details-metadata, #descript, main";

#[derive(Deserialize)]
struct SearchResponse {
    response: SearchDocs,
}

#[derive(Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<Value>,
}

/// Archive.org fields may be a string or an array of strings.
fn text_field(doc: &Value, key: &str) -> Option<String> {
    let text = match doc.get(key)? {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn hits_from_docs(docs: &[Value], max_results: usize) -> Vec<SearchHit> {
    docs.iter()
        .filter_map(|doc| {
            let identifier = text_field(doc, "identifier")?;
            let title = text_field(doc, "title").unwrap_or_else(|| identifier.clone());
            let summary = text_field(doc, "description")
                .unwrap_or_else(|| format!("Archive.org item: {}", identifier));
            Some(
                SearchHit::new(title, format!("https://archive.org/details/{}", identifier), summary)
                    .with("identifier", identifier.clone())
                    .with("date", text_field(doc, "date").unwrap_or_default())
                    .with("mediatype", text_field(doc, "mediatype").unwrap_or_default()),
            )
        })
        .take(max_results)
        .collect()
}

/// Internet Archive advanced search, then the item details page.
pub struct ArchiveOrgSource {
    fetcher: PageFetcher,
    search_url: String,
}

impl ArchiveOrgSource {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            search_url: ADVANCED_SEARCH_URL.to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for ArchiveOrgSource {
    fn name(&self) -> &str {
        "archive_org"
    }

    async fn search_topic(&self, topic: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!("Searching Archive.org for '{}' (max {} results)", topic, max_results);
        let rows = max_results.max(1).to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", topic),
            ("rows", rows.as_str()),
            ("page", "1"),
            ("output", "json"),
        ];
        params.extend(FIELDS.iter().map(|field| ("fl[]", *field)));

        let response: SearchResponse = self
            .fetcher
            .client()
            .get(&self.search_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = hits_from_docs(&response.response.docs, max_results);
        info!("Found {} results from Archive.org", hits.len());
        Ok(hits)
    }

    async fn fetch(&self, hit: &SearchHit) -> Result<ScrapedContent> {
        self.fetcher.fetch(self.name(), hit, Some(CONTENT_ROOT)).await
    }
}

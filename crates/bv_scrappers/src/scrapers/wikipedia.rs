use async_trait::async_trait;
use bv_core::{Result, ScrapedContent};
use serde::Deserialize;
use tracing::{debug, info, warn};
use super::{ContentSource, PageFetcher, SearchHit};

pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const CONTENT_ROOT: &str = "#mw-content-text";

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    pageid: Option<u64>,
    title: String,
    #[serde(default)]
    index: u32,
    extract: Option<String>,
    fullurl: Option<String>,
    #[serde(default)]
    missing: bool,
}

pub fn page_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
}

/// Search results ordered by relevance; missing pages dropped.
fn hits_from_response(response: QueryResponse) -> Vec<SearchHit> {
    let mut pages: Vec<Page> = response
        .query
        .map(|q| q.pages)
        .unwrap_or_default()
        .into_iter()
        .filter(|page| !page.missing)
        .collect();
    pages.sort_by_key(|page| page.index);

    pages
        .into_iter()
        .map(|page| {
            let url = page.fullurl.clone().unwrap_or_else(|| page_url(&page.title));
            let summary = page.extract.clone().unwrap_or_default();
            let hit = SearchHit::new(page.title, url, summary.trim());
            match page.pageid {
                Some(id) => hit.with("page_id", id),
                None => hit,
            }
        })
        .collect()
}

/// MediaWiki search for discovery, then the rendered article page for content.
pub struct WikipediaSource {
    fetcher: PageFetcher,
    api_url: String,
}

impl WikipediaSource {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            api_url: WIKIPEDIA_API_URL.to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn search_topic(&self, topic: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!("Searching Wikipedia for '{}' (max {} results)", topic, max_results);
        let limit = max_results.max(1).to_string();
        let response: QueryResponse = self
            .fetcher
            .client()
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", topic),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts|info"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("inprop", "url"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = hits_from_response(response);
        if hits.is_empty() {
            warn!("No Wikipedia results for '{}'", topic);
        }
        debug!("Wikipedia results: {:?}", hits.iter().map(|h| &h.title).collect::<Vec<_>>());
        Ok(hits)
    }

    async fn fetch(&self, hit: &SearchHit) -> Result<ScrapedContent> {
        self.fetcher.fetch(self.name(), hit, Some(CONTENT_ROOT)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_follow_search_index() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"batchcomplete":true,"query":{"pages":[
                {"pageid":20,"ns":0,"title":"Ashoka","index":2,"extract":"Ashoka was an emperor.","fullurl":"https://en.wikipedia.org/wiki/Ashoka"},
                {"pageid":10,"ns":0,"title":"Maurya Empire","index":1,"extract":" The Maurya Empire... "},
                {"ns":0,"title":"Ghost","missing":true,"index":3}
            ]}}"#,
        )
        .unwrap();

        let hits = hits_from_response(response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Maurya Empire");
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/Maurya_Empire");
        assert_eq!(hits[0].summary, "The Maurya Empire...");
        assert_eq!(hits[0].extra["page_id"], 10);
        assert_eq!(hits[1].url, "https://en.wikipedia.org/wiki/Ashoka");
    }

    #[test]
    fn test_no_results() {
        let response: QueryResponse = serde_json::from_str(r#"{"batchcomplete":true}"#).unwrap();
        assert!(hits_from_response(response).is_empty());
    }
}

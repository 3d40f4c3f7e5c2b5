use bv_client::{ApiClient, CachedArticleClient, OfflineCache, Origin};
use bv_core::{Article, ArticleStorage, Citation, Error, SearchSuggestion};
use bv_storage::{InMemoryStorage, SQLiteStorage};
use axum::routing::get;
use axum::Router;
use bv_web::{create_app, AppState};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
}

fn article(id: &str, title: &str) -> Article {
    let now = Utc::now();
    Article {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("About {}.", title),
        content: format!("{} shaped the subcontinent.", title),
        sections: Vec::new(),
        citations: vec![Citation {
            text: title.to_string(),
            source_url: "https://en.wikipedia.org/wiki/Main_Page".into(),
            source_name: "wikipedia".into(),
            accessed_date: now,
        }],
        publication_date: date(),
        reading_time_minutes: 5,
        author: "BharatVerse AI".into(),
        tags: vec!["history".into()],
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

async fn memory() -> Arc<dyn ArticleStorage> {
    Arc::new(InMemoryStorage::new())
}

async fn sqlite() -> Arc<dyn ArticleStorage> {
    Arc::new(SQLiteStorage::in_memory().await.unwrap())
}

async fn start_server(storage: Arc<dyn ArticleStorage>) -> (String, JoinHandle<()>) {
    storage.store_article(&article("art_20260215_001", "Vijayanagara Empire")).await.unwrap();
    storage.store_article(&article("art_20260215_002", "Hampi")).await.unwrap();
    storage
        .add_suggestions(&[SearchSuggestion {
            phrase: "Vijayanagara Empire".into(),
            article_id: "art_20260215_001".into(),
            weight: 10,
        }])
        .await
        .unwrap();
    storage.set_daily_article(date(), "art_20260215_002").await.unwrap();

    serve(create_app(AppState::new(storage), "/api/v1")).await
}

async fn serve(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/v1", addr), handle)
}

fn api(base_url: &str) -> ApiClient {
    // No pooled connections, so a stopped server is seen right away.
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    ApiClient::with_client(client, base_url).unwrap()
}

async fn api_client_reads_the_api(storage: Arc<dyn ArticleStorage>) {
    let (base_url, server) = start_server(storage).await;
    let api = api(&base_url);

    let daily = api.daily_article(Some(date())).await.unwrap();
    assert_eq!(daily.id, "art_20260215_002");

    let list = api.list_articles(10, 0).await.unwrap();
    assert_eq!(list.len(), 2);

    let results = api.search("vijayanagara", 5).await.unwrap();
    assert_eq!(results[0].article_id, "art_20260215_001");

    let suggestions = api.suggestions("vija", 5).await.unwrap();
    assert_eq!(suggestions, vec!["Vijayanagara Empire"]);

    let missing = api.get_article("art_20990101_001").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
    let bad = api.search("   ", 5).await;
    assert!(matches!(bad, Err(Error::Validation(_))));

    server.abort();
}

async fn cached_client_falls_back_when_offline(storage: Arc<dyn ArticleStorage>) {
    let (base_url, server) = start_server(storage).await;
    let cache = OfflineCache::in_memory().await.unwrap();
    let client = CachedArticleClient::new(api(&base_url), cache);

    let (article, origin) = client.get_article("art_20260215_001").await.unwrap();
    assert_eq!(origin, Origin::Network);
    assert_eq!(article.title, "Vijayanagara Empire");
    client.daily_article(Some(date())).await.unwrap();
    assert_eq!(client.cache().len().await.unwrap(), 2);

    // API errors are not masked by the cache.
    let missing = client.get_article("art_20990101_001").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    server.abort();
    let _ = server.await;

    let (article, origin) = client.get_article("art_20260215_001").await.unwrap();
    assert_eq!(origin, Origin::Cache);
    assert_eq!(article.title, "Vijayanagara Empire");

    let uncached = client.get_article("art_20260215_003").await;
    assert!(matches!(uncached, Err(Error::Http(_))));
}

#[tokio::test]
async fn api_client_reads_the_api_from_memory() {
    api_client_reads_the_api(memory().await).await
}

#[tokio::test]
async fn api_client_reads_the_api_from_sqlite() {
    api_client_reads_the_api(sqlite().await).await
}

#[tokio::test]
async fn cached_client_falls_back_from_memory() {
    cached_client_falls_back_when_offline(memory().await).await
}

#[tokio::test]
async fn cached_client_falls_back_from_sqlite() {
    cached_client_falls_back_when_offline(sqlite().await).await
}

#[tokio::test]
async fn garbled_response_is_not_served_from_cache() {
    let app = Router::new().route("/api/v1/articles/:id", get(|| async { "<html>maintenance</html>" }));
    let (base_url, server) = serve(app).await;

    let cache = OfflineCache::in_memory().await.unwrap();
    cache.put(&article("art_20260215_001", "Vijayanagara Empire")).await.unwrap();
    let client = CachedArticleClient::new(api(&base_url), cache);

    // The server answered; its body is just not an article.
    match client.get_article("art_20260215_001").await {
        Err(Error::Http(e)) => assert!(e.is_decode()),
        other => panic!("expected a decode error, got {:?}", other.map(|(a, o)| (a.id, o))),
    }
    server.abort();
}

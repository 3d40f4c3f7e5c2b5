use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bv_core::{Article, ArticleStorage, Citation, SearchSuggestion, Section};
use bv_inference::models::DummyModel;
use bv_storage::{InMemoryStorage, SQLiteStorage};
use bv_web::{create_app, AppState};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
}

fn article(id: &str, title: &str, content: &str) -> Article {
    let now = Utc::now();
    Article {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("About {}.", title),
        content: content.to_string(),
        sections: vec![Section {
            heading: "Overview".into(),
            content: content.to_string(),
            order: 1,
        }],
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

struct Fixture {
    app: Router,
    storage: Arc<dyn ArticleStorage>,
}

async fn memory() -> Arc<dyn ArticleStorage> {
    Arc::new(InMemoryStorage::new())
}

async fn sqlite() -> Arc<dyn ArticleStorage> {
    Arc::new(SQLiteStorage::in_memory().await.unwrap())
}

async fn setup(storage: Arc<dyn ArticleStorage>) -> Fixture {
    storage
        .store_article(&article("art_20260215_001", "Chola Dynasty", "The Cholas built a navy."))
        .await
        .unwrap();
    storage
        .store_article(&article("art_20260215_002", "Maurya Empire", "Ashoka ruled the Mauryas."))
        .await
        .unwrap();
    storage
        .store_article(&article("art_20260215_003", "Ṛgveda", "Hymns to Agni and Indra."))
        .await
        .unwrap();
    storage
        .add_suggestions(&[
            SearchSuggestion {
                phrase: "Chola Dynasty".into(),
                article_id: "art_20260215_001".into(),
                weight: 10,
            },
            SearchSuggestion {
                phrase: "Ṛgveda".into(),
                article_id: "art_20260215_003".into(),
                weight: 10,
            },
        ])
        .await
        .unwrap();
    storage.set_daily_article(date(), "art_20260215_002").await.unwrap();

    let state = AppState::new(storage.clone()).with_embedder(Arc::new(DummyModel::new()));
    Fixture {
        app: create_app(state, "/api/v1"),
        storage,
    }
}

/// Runs each named case once per storage backend.
macro_rules! on_every_backend {
    ($($case:ident),* $(,)?) => {
        mod memory_backend {
            $(
                #[tokio::test]
                async fn $case() {
                    super::$case(super::setup(super::memory().await).await).await
                }
            )*
        }
        mod sqlite_backend {
            $(
                #[tokio::test]
                async fn $case() {
                    super::$case(super::setup(super::sqlite().await).await).await
                }
            )*
        }
    };
}

on_every_backend!(
    health_is_outside_the_prefix,
    list_articles_paginates,
    daily_article_by_date,
    article_carries_like_count,
    search_and_suggestions,
    user_likes_flow,
    invalid_user_is_rejected,
    malformed_query_is_a_json_error,
    malformed_body_is_a_json_error,
);

async fn send_raw(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn health_is_outside_the_prefix(Fixture { app, .. }: Fixture) {
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

async fn list_articles_paginates(Fixture { app, .. }: Fixture) {
    let (status, body) = get(&app, "/api/v1/articles?limit=1&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("content").is_none());

    let (_, all) = get(&app, "/api/v1/articles?limit=1000").await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, past_end) = get(&app, "/api/v1/articles?offset=18446744073709551615").await;
    assert_eq!(status, StatusCode::OK);
    assert!(past_end.as_array().unwrap().is_empty());
}

async fn daily_article_by_date(Fixture { app, .. }: Fixture) {
    let (status, body) = get(&app, "/api/v1/articles/daily?date=2026-02-15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "art_20260215_002");

    let (status, body) = get(&app, "/api/v1/articles/daily?date=2026-02-16").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = get(&app, "/api/v1/articles/daily?date=15-02-2026").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

async fn article_carries_like_count(Fixture { app, .. }: Fixture) {
    let (status, body) = get(&app, "/api/v1/articles/art_20260215_001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Chola Dynasty");
    assert_eq!(body["like_count"], 0);

    let (status, _) = get(&app, "/api/v1/articles/art_20990101_001").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn search_and_suggestions(Fixture { app, .. }: Fixture) {
    let (status, body) = get(&app, "/api/v1/search?q=chola").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "chola");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["article_id"], "art_20260215_001");
    assert_eq!(results[0]["rank"], 1);

    let (status, body) = get(&app, "/api/v1/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = get(&app, "/api/v1/search/suggestions?q=cho").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], json!(["Chola Dynasty"]));

    // "ṚG", percent-encoded; folding is not limited to ASCII.
    let (status, body) = get(&app, "/api/v1/search/suggestions?q=%E1%B9%9AG").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], json!(["Ṛgveda"]));
}

async fn malformed_query_is_a_json_error(Fixture { app, .. }: Fixture) {
    for uri in [
        "/api/v1/articles?limit=abc",
        "/api/v1/articles?offset=-3",
        "/api/v1/search?q=chola&limit=-1",
        "/api/v1/search/suggestions?q=cho&limit=many",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "bad_request", "{}", uri);
        assert!(body["error"]["message"].is_string(), "{}", uri);
    }
}

async fn malformed_body_is_a_json_error(Fixture { app, storage }: Fixture) {
    let (status, body) = send_raw(&app, Method::POST, "/api/v1/users", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) =
        send_raw(&app, Method::POST, "/api/v1/users", r#"{"display_name":"Meera"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("email"));

    assert!(storage.get_user("Meera").await.unwrap().is_none());
}

async fn user_likes_flow(Fixture { app, storage }: Fixture) {
    let new_user = json!({ "display_name": "Meera", "email": "meera@example.com" });
    let (status, user) = send(&app, Method::POST, "/api/v1/users", Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, "/api/v1/users", Some(new_user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let like_uri = format!("/api/v1/users/{}/likes/art_20260215_001", user_id);
    let (status, like) = send(&app, Method::POST, &like_uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(like["article_id"], "art_20260215_001");
    let (status, _) = send(&app, Method::POST, &like_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(storage.like_count("art_20260215_001").await.unwrap(), 1);

    let (status, likes) = get(&app, &format!("/api/v1/users/{}/likes", user_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(likes[0]["id"], "art_20260215_001");

    let missing = format!("/api/v1/users/{}/likes/art_20990101_001", user_id);
    let (status, _) = send(&app, Method::POST, &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &like_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &like_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn invalid_user_is_rejected(Fixture { app, .. }: Fixture) {
    let body = json!({ "display_name": " ", "email": "not-an-email" });
    let (status, body) = send(&app, Method::POST, "/api/v1/users", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = get(&app, "/api/v1/users/nobody/likes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_prefix() {
    let storage = memory().await;
    let app = create_app(AppState::new(storage), "/v2/");
    let (status, _) = get(&app, "/v2/articles").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/api/v1/articles").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

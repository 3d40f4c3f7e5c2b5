use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bv_core::{Article, ArticlePreview, Error, Like, User};
use bv_storage::SearchResult;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
pub const MAX_SUGGESTION_LIMIT: usize = 20;

fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<ArticlePreview>>> {
    let limit = clamp_limit(page.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let articles = state
        .storage
        .list_articles(limit, page.offset.unwrap_or(0))
        .await?;
    Ok(Json(articles.iter().map(Article::preview).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

pub async fn daily_article(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> ApiResult<Json<Article>> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?,
        None => Utc::now().date_naive(),
    };
    state
        .storage
        .get_daily_article(date)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("daily article for {}", date)).into())
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    #[serde(flatten)]
    pub article: Article,
    pub like_count: u64,
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ArticleResponse>> {
    let article = state
        .storage
        .get_article(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
    let like_count = state.storage.like_count(&id).await?;
    Ok(Json(ArticleResponse { article, like_count }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Query parameter 'q' must not be empty".into()));
    }
    let limit = clamp_limit(query.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
    let results = state.search.search(&q, limit).await?;
    Ok(Json(SearchResponse { query: q, results }))
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let limit = clamp_limit(query.limit, DEFAULT_SUGGESTION_LIMIT, MAX_SUGGESTION_LIMIT);
    let prefix = query.q.unwrap_or_default();
    let suggestions = state.search.suggest(prefix.trim(), limit).await?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let mut problems = Vec::new();
    if new_user.display_name.trim().is_empty() {
        problems.push("display_name must not be empty".to_string());
    }
    let email = new_user.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => problems.push(format!("'{}' is not a valid email address", email)),
    }
    if !problems.is_empty() {
        return Err(Error::Validation(problems).into());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        display_name: new_user.display_name.trim().to_string(),
        email: email.to_string(),
        created_at: Utc::now(),
    };
    state.storage.create_user(&user).await?;
    info!("Created user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Serialize)]
pub struct LikedArticle {
    #[serde(flatten)]
    pub article: ArticlePreview,
    pub liked_at: chrono::DateTime<Utc>,
}

pub async fn user_likes(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<LikedArticle>>> {
    if state.storage.get_user(&user_id).await?.is_none() {
        return Err(Error::NotFound(format!("user {}", user_id)).into());
    }
    let mut liked = Vec::new();
    for like in state.storage.list_likes(&user_id).await? {
        if let Some(article) = state.storage.get_article(&like.article_id).await? {
            liked.push(LikedArticle {
                article: article.preview(),
                liked_at: like.created_at,
            });
        }
    }
    Ok(Json(liked))
}

pub async fn like_article(
    State(state): State<Arc<AppState>>,
    Path((user_id, article_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<Like>)> {
    let like = state.storage.like_article(&user_id, &article_id).await?;
    Ok((StatusCode::CREATED, Json(like)))
}

pub async fn unlike_article(
    State(state): State<Arc<AppState>>,
    Path((user_id, article_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.storage.unlike_article(&user_id, &article_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! `Json` and `Query` extractors whose rejections render as [`ApiError`],
//! so malformed input gets the same error body as every other failure.

use axum::extract::{FromRequest, FromRequestParts};
use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

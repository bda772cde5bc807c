//! Body, path and query extractors whose rejections render as [`ApiError`],
//! so a malformed request gets the same error envelope as an engine failure.

use axum::{
  Json,
  extract::{
    FromRequest, FromRequestParts, Path, Query, Request,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// [`Json`] with an [`ApiError`] rejection.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state).await.map_err(rejected)?;
    Ok(Self(value))
  }
}

/// [`Path`] with an [`ApiError`] rejection.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(value) = Path::<T>::from_request_parts(parts, state).await.map_err(rejected)?;
    Ok(Self(value))
  }
}

/// [`Query`] with an [`ApiError`] rejection.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Query(value) = Query::<T>::from_request_parts(parts, state).await.map_err(rejected)?;
    Ok(Self(value))
  }
}

fn rejected(rejection: impl Into<ApiError>) -> ApiError {
  let err = rejection.into();
  tracing::debug!(error = %err, "rejected request");
  err
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self {
    ApiError::Malformed { status: r.status(), message: r.body_text() }
  }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self {
    ApiError::Malformed { status: r.status(), message: r.body_text() }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self {
    ApiError::Malformed { status: r.status(), message: r.body_text() }
  }
}

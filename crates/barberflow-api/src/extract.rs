//! Extractors whose rejections render as `{ "message": ... }` like every
//! other handler failure.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use tracing::debug;

use crate::error::ApiError;

/// `Json<T>` with a 400 `{message}` on a missing, malformed or mistyped body.
pub struct ApiJson<T>(pub T);

/// `Path<T>`, so a malformed id is a 400 `Invalid id`.
pub struct ApiPath<T>(pub T);

pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected request body");
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON body",
            _ => "Invalid request body",
        };
        Self::bad_request(message)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected path parameter");
        Self::bad_request("Invalid id")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected query string");
        Self::bad_request("Invalid query parameters")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{self, header}};
    use serde_json::Value;
    use uuid::Uuid;

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let req = http::Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = ApiJson::<Value>::from_request(req, &()).await.err().unwrap();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Malformed JSON body"));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let req = http::Request::builder().body(Body::from("{}")).unwrap();
        let err = ApiJson::<Value>::from_request(req, &()).await.err().unwrap();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn query_type_mismatch_is_a_bad_request() {
        let req = http::Request::builder().uri("/?id=nope").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ApiQuery::<std::collections::HashMap<String, Uuid>>::from_request_parts(
            &mut parts,
            &(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid query parameters"));
    }
}

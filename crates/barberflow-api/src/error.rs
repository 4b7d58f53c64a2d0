use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use barberflow_billing::StripeError;
use barberflow_db::StoreError;
use barberflow_types::api::MessageResponse;
use thiserror::Error;
use tracing::error;

/// Every handler failure. Rendered as `{ "message": ... }` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Logged in full, sent to the client as a generic message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(err) => {
                error!(error = ?err, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::bad_request("Record already exists"),
            StoreError::SlotTaken => Self::bad_request("Time slot is already booked"),
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

impl From<StripeError> for ApiError {
    fn from(err: StripeError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_message(err: ApiError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: MessageResponse = serde_json::from_slice(&bytes).unwrap();
        (status, body.message)
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, message) = body_message(ApiError::not_found("Client not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Client not found");
    }

    #[tokio::test]
    async fn internal_errors_are_redacted() {
        let err = ApiError::Internal(anyhow::anyhow!("disk I/O error at /var/db"));
        let (status, message) = body_message(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal Server Error");
    }

    #[tokio::test]
    async fn slot_conflicts_are_bad_requests() {
        let (status, message) = body_message(StoreError::SlotTaken.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Time slot is already booked");
    }
}

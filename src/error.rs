use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Missing or invalid environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing MongoDB connection string; set MONGODB_URI (preferred) or NEXT_PUBLIC_MONGODB_URI"
    )]
    MissingConnectionString,
    #[error(
        "no signing secret for {purpose}; set {vars}, or APP_ENV=development to use the insecure fallback"
    )]
    MissingSecret {
        purpose: &'static str,
        vars: &'static str,
    },
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Failures talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("connection failed: {0}")]
    Connect(String),
}

/// Error returned from HTTP handlers. The body is always `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    CredentialsSignin,
    AccountNotLinked,
    OAuthCallback,
    BadRequest(String),
    NotFound(String),
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    /// Logs the cause and hides it from the caller.
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        error!(error = %e, "internal error");
        ApiError::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::CredentialsSignin | ApiError::OAuthCallback => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AccountNotLinked => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::CredentialsSignin => "CredentialsSignin",
            ApiError::AccountNotLinked => "OAuthAccountNotLinked",
            ApiError::OAuthCallback => "OAuthCallback",
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Internal => "Internal Server Error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_body() {
        let (status, body) = body_of(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let (status, body) = body_of(ApiError::internal("socket closed at 10.0.0.3:27017")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn message_variants_render_their_text() {
        let (status, body) = body_of(ApiError::NotFound("Unknown provider".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"error":"Unknown provider"}"#);

        let (status, body) = body_of(ApiError::AccountNotLinked).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"error":"OAuthAccountNotLinked"}"#);
    }
}

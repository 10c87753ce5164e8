use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};
use crate::ShopError;

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "An unexpected error occurred. Please try again later.".to_string()
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };
        let mut body = json!({ "code": self.code(), "message": message });
        if let Self::Validation { details, .. } = &self {
            if !details.is_empty() {
                body["details"] = json!(details);
            }
        }
        (status, Json(json!({ "success": false, "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body(err: ShopError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_has_details() {
        let (status, json) = body(ShopError::field("quantity", "Only 3 items available in stock")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "validation_error");
        assert_eq!(json["error"]["details"]["quantity"], "Only 3 items available in stock");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body(ShopError::Storage("connection reset".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "server_error");
        assert!(!json["error"]["message"].as_str().unwrap().contains("connection"));
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ShopError::NotFound("Order").status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::Conflict("paid".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ShopError::InvalidState("empty".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ShopError::unauthenticated("no").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ShopError::permission_denied("no").status(), StatusCode::FORBIDDEN);
    }
}

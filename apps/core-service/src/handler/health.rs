//! # ヘルスチェックハンドラ
//!
//! ```text
//! GET /health
//! ```

use axum::Json;
use erpflow_shared::HealthResponse;

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::handler::test_helpers::response_body;

    #[tokio::test]
    async fn test_healthyとバージョンを返す() {
        let sut = Router::new().route("/health", get(health_check));

        let response = sut
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body: HealthResponse = response_body(response).await;
        assert_eq!(body, HealthResponse::healthy(env!("CARGO_PKG_VERSION")));
    }
}

//! # ERPFlow 共通ユーティリティ
//!
//! 全クレートで使うレスポンス型とロギング基盤。
//!
//! - [`ApiResponse`] - `{ "data": T }` 形式のエンベロープ
//! - [`ErrorResponse`] - RFC 9457 Problem Details 形式のエラーボディ
//! - [`HealthResponse`] - ヘルスチェック
//! - [`event_log`] - ビジネスイベントログの規約と [`log_business_event!`] マクロ
//! - [`observability`] - トレーシング初期化（`observability` feature）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;

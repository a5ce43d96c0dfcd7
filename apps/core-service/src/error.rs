//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! 業務ルール違反（[`ActionError`]）は 403 / 422 に、インフラ障害は 500 に変換する。
//! レスポンスボディは [`ErrorResponse`]（RFC 9457 Problem Details）。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use erpflow_domain::{DomainError, action::ActionError};
use erpflow_infra::InfraError;
use erpflow_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 競合（楽観的ロック失敗）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// ワークフロー操作の業務エラー
    #[error(transparent)]
    Action(#[from] ActionError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl CoreError {
    /// インフラ障害か（アクション境界で結果に変換せず伝播させる）
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

impl From<DomainError> for CoreError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} ({id})"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

fn action_error_response(e: &ActionError) -> (StatusCode, ErrorResponse) {
    let unprocessable = |suffix: &str| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::unprocessable(suffix, e.to_string()),
        )
    };
    match e {
        ActionError::PermissionDenied { .. } => {
            (StatusCode::FORBIDDEN, ErrorResponse::forbidden(e.to_string()))
        }
        ActionError::ConfigurationMissing(_) => unprocessable("configuration-missing"),
        ActionError::InvalidTransition { .. } => unprocessable("invalid-transition"),
        ActionError::UnknownAction(_) => unprocessable("unknown-action"),
        ActionError::PreconditionFailed { .. } => unprocessable("precondition-failed"),
        ActionError::InvalidInput(_) => unprocessable("invalid-input"),
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg)),
            CoreError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg))
            }
            CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::forbidden(msg)),
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::conflict(msg)),
            CoreError::Action(e) => action_error_response(e),
            CoreError::Database(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    "データベースエラー: {}",
                    e
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal_error(),
                )
            }
            CoreError::Internal(msg) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal_error(),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! - 各ハンドラはサブモジュールに配置し、ここで re-export する
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースに委譲する
//!
//! 文書は `/{kind}/{id}` のパスで指定する（`kind` は `purchase_order` などの文書種別キー）。

pub mod document;
pub mod document_action;
pub mod health;

pub use document::{DocumentState, register_document, update_notes};
pub use document_action::{
    DocumentActionState,
    execute_action,
    list_actions,
    reactivate,
    workflow_status,
};
use erpflow_domain::document::{DocumentId, DocumentKind, DocumentRef};
pub use health::health_check;
use uuid::Uuid;

use crate::error::CoreError;

/// パスの文書種別キーと ID から文書参照を作る
pub(crate) fn document_ref(kind: &str, id: Uuid) -> Result<DocumentRef, CoreError> {
    let kind: DocumentKind = kind.parse()?;
    Ok(DocumentRef::new(kind, DocumentId::from_uuid(id)))
}

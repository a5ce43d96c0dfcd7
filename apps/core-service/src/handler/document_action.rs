//! # 文書アクションハンドラ
//!
//! 文書ワークフローのアクション提示・実行・再開・状況参照の内部 API。
//!
//! ## エンドポイント
//!
//! - `GET /internal/documents/{kind}/{id}/actions` - 実行可能アクション一覧
//! - `POST /internal/documents/{kind}/{id}/actions/{action}` - アクション実行
//! - `POST /internal/documents/{kind}/{id}/reactivate` - 再開
//! - `GET /internal/documents/{kind}/{id}/workflow` - ワークフロー状況
//!
//! アクション実行と再開は業務エラーでも `200 OK` で `{ success: false, message }` を返す。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use erpflow_domain::{
    action::ActionParams,
    document::WorkflowDocument,
    lifecycle::FieldLock,
    user::UserId,
    value_objects::Money,
    workflow::WorkflowApproval,
};
use erpflow_shared::ApiResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document_ref;
use crate::{
    error::CoreError,
    usecase::{AvailableAction, WorkflowStatusView, WorkflowUseCaseImpl},
};

/// 文書アクション API の共有状態
pub struct DocumentActionState {
    pub usecase: Arc<WorkflowUseCaseImpl>,
}

// --- リクエスト/レスポンス型 ---

/// 操作者クエリパラメータ
///
/// 認証は前段（BFF）の責務。スーパーユーザーかどうかはサーバー側で解決する。
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub user_id: Uuid,
}

/// アクション実行リクエスト
#[derive(Debug, Deserialize)]
pub struct ExecuteActionRequest {
    pub user_id: Uuid,
    pub comment: Option<String>,
    /// 一部入金の金額
    pub amount:  Option<Decimal>,
}

/// 再開リクエスト
#[derive(Debug, Deserialize)]
pub struct ReactivateRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AvailableActionDto {
    pub action:       String,
    pub label:        String,
    pub button_color: String,
    pub to_state:     String,
    pub permitted:    bool,
}

impl From<AvailableAction> for AvailableActionDto {
    fn from(a: AvailableAction) -> Self {
        Self {
            action:       a.action.into_string(),
            label:        a.label.into_string(),
            button_color: a.button_color.to_string(),
            to_state:     a.to_state.into_string(),
            permitted:    a.permitted,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApprovalDto {
    pub id:                Uuid,
    pub status:            String,
    pub requested_by:      Uuid,
    pub approver:          Option<Uuid>,
    pub amount_at_request: Option<Decimal>,
    pub comments:          Option<String>,
    pub requested_at:      String,
    pub responded_at:      Option<String>,
}

impl From<&WorkflowApproval> for ApprovalDto {
    fn from(a: &WorkflowApproval) -> Self {
        Self {
            id:                *a.id().as_uuid(),
            status:            a.status().to_string(),
            requested_by:      *a.requested_by().as_uuid(),
            approver:          a.approver().map(|u| *u.as_uuid()),
            amount_at_request: a.amount_at_request().map(Decimal::from),
            comments:          a.comments().map(str::to_string),
            requested_at:      a.requested_at().to_rfc3339(),
            responded_at:      a.responded_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// ワークフロー状況 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStatusDto {
    pub document_type:       String,
    pub document_id:         Option<Uuid>,
    pub document_no:         String,
    pub doc_status:          String,
    pub current_state:       Option<String>,
    pub current_state_label: Option<String>,
    pub version:             Option<i32>,
    pub field_lock:          String,
    pub needs_approval:      bool,
    pub approvals:           Vec<ApprovalDto>,
}

fn field_lock_str(lock: FieldLock) -> &'static str {
    match lock {
        FieldLock::Unlocked => "unlocked",
        FieldLock::NotesOnly => "notes_only",
        FieldLock::Locked => "locked",
    }
}

impl From<WorkflowStatusView> for WorkflowStatusDto {
    fn from(view: WorkflowStatusView) -> Self {
        let header = view.document.header();
        Self {
            document_type:       view.document.document_type().to_string(),
            document_id:         header.id.as_ref().map(|id| *id.as_uuid()),
            document_no:         header.document_no.clone(),
            doc_status:          header.doc_status.to_string(),
            current_state:       view.current_state.as_ref().map(|s| s.name().to_string()),
            current_state_label: view
                .current_state
                .as_ref()
                .map(|s| s.display_name().to_string()),
            version:             view.workflow.as_ref().map(|w| w.version().as_i32()),
            field_lock:          field_lock_str(view.field_lock).to_string(),
            needs_approval:      view.needs_approval,
            approvals:           view.approvals.iter().map(ApprovalDto::from).collect(),
        }
    }
}

// --- ハンドラ ---

/// GET /internal/documents/{kind}/{id}/actions
///
/// 現在状態から提示するアクションを遷移先の並び順で返す。
#[tracing::instrument(skip_all, fields(%kind, %id))]
pub async fn list_actions(
    State(state): State<Arc<DocumentActionState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(query): Query<ActorQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let document = document_ref(&kind, id)?;
    let actor = state
        .usecase
        .resolve_actor(UserId::from_uuid(query.user_id))
        .await?;

    let actions = state.usecase.available_actions(&document, &actor).await?;

    let items: Vec<AvailableActionDto> = actions.into_iter().map(Into::into).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// POST /internal/documents/{kind}/{id}/actions/{action}
///
/// ## レスポンス
///
/// - `200 OK`: `{ success, message }`（業務エラーも含む）
/// - `400 Bad Request`: 文書種別・金額の形式不正
/// - `500 Internal Server Error`: インフラ障害
#[tracing::instrument(skip_all, fields(%kind, %id, %action))]
pub async fn execute_action(
    State(state): State<Arc<DocumentActionState>>,
    Path((kind, id, action)): Path<(String, Uuid, String)>,
    Json(req): Json<ExecuteActionRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let document = document_ref(&kind, id)?;
    let actor = state
        .usecase
        .resolve_actor(UserId::from_uuid(req.user_id))
        .await?;
    let params = ActionParams {
        comment: req.comment,
        amount:  req.amount.map(Money::new).transpose()?,
    };

    let outcome = state
        .usecase
        .invoke_action(&document, &action, &actor, params)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(outcome))))
}

/// POST /internal/documents/{kind}/{id}/reactivate
#[tracing::instrument(skip_all, fields(%kind, %id))]
pub async fn reactivate(
    State(state): State<Arc<DocumentActionState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<ReactivateRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let document = document_ref(&kind, id)?;
    let actor = state
        .usecase
        .resolve_actor(UserId::from_uuid(req.user_id))
        .await?;

    let outcome = state.usecase.invoke_reactivation(&document, &actor).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(outcome))))
}

/// GET /internal/documents/{kind}/{id}/workflow
#[tracing::instrument(skip_all, fields(%kind, %id))]
pub async fn workflow_status(
    State(state): State<Arc<DocumentActionState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, CoreError> {
    let document = document_ref(&kind, id)?;

    let view = state.usecase.workflow_status(&document).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(WorkflowStatusDto::from(view))),
    ))
}

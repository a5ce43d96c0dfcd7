//! # 文書ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /internal/documents/{kind}` - 文書登録（採番とワークフロー作成）
//! - `PATCH /internal/documents/{kind}/{id}` - 備考・追跡番号の更新

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use erpflow_domain::{
    document::{Document, DocumentKind, WorkflowDocument},
    user::UserId,
    value_objects::Money,
};
use erpflow_shared::ApiResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document_ref;
use crate::{
    error::CoreError,
    usecase::{DocumentUseCaseImpl, NewDocumentInput, UpdateNotesInput},
};

/// 文書 API の共有状態
pub struct DocumentState {
    pub usecase: DocumentUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Deserialize)]
pub struct RegisterDocumentRequest {
    pub user_id:     Uuid,
    pub grand_total: Decimal,
    pub document_no: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    pub user_id:     Uuid,
    pub description: Option<String>,
    pub tracking_no: Option<String>,
}

/// 文書 DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentDto {
    pub id:            Option<Uuid>,
    pub document_type: String,
    pub document_no:   String,
    pub doc_status:    String,
    pub grand_total:   Decimal,
    pub description:   Option<String>,
    pub tracking_no:   Option<String>,
    pub updated_at:    String,
    /// 登録時に作成されたワークフローの状態
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_state: Option<String>,
}

impl From<&Document> for DocumentDto {
    fn from(document: &Document) -> Self {
        let header = document.header();
        Self {
            id:             header.id.as_ref().map(|id| *id.as_uuid()),
            document_type:  document.document_type().to_string(),
            document_no:    header.document_no.clone(),
            doc_status:     header.doc_status.to_string(),
            grand_total:    header.grand_total.into(),
            description:    header.description.clone(),
            tracking_no:    match document {
                Document::Shipment(s) => s.tracking_no.clone(),
                _ => None,
            },
            updated_at:     header.updated_at.to_rfc3339(),
            workflow_state: None,
        }
    }
}

// --- ハンドラ ---

/// POST /internal/documents/{kind}
///
/// ## レスポンス
///
/// - `201 Created`: 登録された文書
/// - `400 Bad Request`: 文書種別・金額の形式不正
/// - `409 Conflict`: 文書番号の重複
#[tracing::instrument(skip_all, fields(%kind))]
pub async fn register_document(
    State(state): State<Arc<DocumentState>>,
    Path(kind): Path<String>,
    Json(req): Json<RegisterDocumentRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let input = NewDocumentInput {
        kind:        kind.parse::<DocumentKind>()?,
        grand_total: Money::new(req.grand_total)?,
        document_no: req.document_no,
        description: req.description,
    };

    let actor = state
        .usecase
        .resolve_actor(UserId::from_uuid(req.user_id))
        .await?;
    let registered = state.usecase.register_document(input, &actor).await?;

    let dto = DocumentDto {
        workflow_state: registered
            .workflow
            .as_ref()
            .map(|w| w.current_state().to_string()),
        ..DocumentDto::from(&registered.document)
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(dto))))
}

/// PATCH /internal/documents/{kind}/{id}
///
/// ## レスポンス
///
/// - `200 OK`: 更新後の文書
/// - `400 Bad Request`: 更新項目なし、出荷以外への追跡番号
/// - `403 Forbidden`: 現在の状態で項目がロックされている
/// - `404 Not Found`: 文書が見つからない
#[tracing::instrument(skip_all, fields(%kind, %id))]
pub async fn update_notes(
    State(state): State<Arc<DocumentState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateNotesRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let input = UpdateNotesInput {
        document:    document_ref(&kind, id)?,
        description: req.description,
        tracking_no: req.tracking_no,
    };

    let actor = state
        .usecase
        .resolve_actor(UserId::from_uuid(req.user_id))
        .await?;
    let document = state.usecase.update_notes(input, &actor).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DocumentDto::from(&document))),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::{patch, post},
    };
    use erpflow_domain::clock::FixedClock;
    use erpflow_infra::mock::{MockNumberSequenceRepository, MockTransactionManager};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        handler::test_helpers::response_body,
        usecase::workflow::test_helpers::{Mocks, now},
    };

    fn create_test_app(mocks: &Mocks) -> Router {
        let usecase = DocumentUseCaseImpl::new(
            Arc::new(mocks.documents.clone()),
            Arc::new(MockNumberSequenceRepository::new()),
            Arc::new(mocks.sut()),
            Arc::new(FixedClock::new(now())),
            Arc::new(MockTransactionManager),
        );
        let state = Arc::new(DocumentState { usecase });

        Router::new()
            .route("/internal/documents/{kind}", post(register_document))
            .route("/internal/documents/{kind}/{id}", patch(update_notes))
            .with_state(state)
    }

    fn json_request(method: Method, uri: String, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_採番して登録すると201が返る() {
        // Given
        let mocks = Mocks::seeded();
        let sut = create_test_app(&mocks);

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/internal/documents/invoice".to_string(),
                serde_json::json!({ "user_id": Uuid::now_v7(), "grand_total": "1200.50" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: ApiResponse<DocumentDto> = response_body(response).await;
        assert_eq!(body.data.document_type, "invoice");
        assert!(!body.data.document_no.is_empty());
        assert_eq!(body.data.doc_status, "drafted");
        assert_eq!(body.data.grand_total, Decimal::new(120_050, 2));
        assert_eq!(body.data.workflow_state.as_deref(), Some("draft"));
    }

    #[tokio::test]
    async fn test_post_負の金額は400() {
        // Given
        let mocks = Mocks::seeded();
        let sut = create_test_app(&mocks);

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/internal/documents/sales_order".to_string(),
                serde_json::json!({ "user_id": Uuid::now_v7(), "grand_total": "-1" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_重複した文書番号は409() {
        // Given
        let mocks = Mocks::seeded();
        let sut = create_test_app(&mocks);
        let body = serde_json::json!({
            "user_id": Uuid::now_v7(),
            "grand_total": "10",
            "document_no": "PO-9"
        });
        sut.clone()
            .oneshot(json_request(
                Method::POST,
                "/internal/documents/purchase_order".to_string(),
                body.clone(),
            ))
            .await
            .unwrap();

        // When
        let response = sut
            .oneshot(json_request(
                Method::POST,
                "/internal/documents/purchase_order".to_string(),
                body,
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_patch_下書きの備考を更新できる() {
        // Given
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::SalesOrder, 10);
        let sut = create_test_app(&mocks);

        // When
        let response = sut
            .oneshot(json_request(
                Method::PATCH,
                format!("/internal/documents/sales_order/{}", doc.id),
                serde_json::json!({ "user_id": Uuid::now_v7(), "description": "午前着" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body: ApiResponse<DocumentDto> = response_body(response).await;
        assert_eq!(body.data.description.as_deref(), Some("午前着"));
    }

    #[tokio::test]
    async fn test_patch_出荷以外の追跡番号は400() {
        // Given
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 10);
        let sut = create_test_app(&mocks);

        // When
        let response = sut
            .oneshot(json_request(
                Method::PATCH,
                format!("/internal/documents/purchase_order/{}", doc.id),
                serde_json::json!({ "user_id": Uuid::now_v7(), "tracking_no": "TRK-1" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

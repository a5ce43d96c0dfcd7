//! # DocumentWorkflowRepository
//!
//! 文書ワークフローの永続化。状態の更新はバージョン番号による楽観的ロックで行う。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpflow_domain::{
    document::{DocumentId, DocumentRef},
    user::UserId,
    value_objects::{StateName, Version},
    workflow::{
        DocumentWorkflow,
        DocumentWorkflowId,
        DocumentWorkflowRecord,
        WorkflowDefinitionId,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait DocumentWorkflowRepository: Send + Sync {
    async fn find_by_document(
        &self,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError>;

    /// 行ロック（`FOR UPDATE`）を取って読み込む
    ///
    /// ロックはトランザクションの終了まで保持される。
    async fn find_by_document_for_update(
        &self,
        tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError>;

    /// 文書にワークフローがなければ挿入する
    ///
    /// 挿入した場合 `true`。同じ文書の行が既にある場合は何もせず `false`。
    async fn insert_if_absent(
        &self,
        tx: &mut TxContext,
        workflow: &DocumentWorkflow,
    ) -> Result<bool, InfraError>;

    /// バージョンチェック付きで状態を更新する
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: `expected_version` が DB 上のバージョンと一致しない
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        workflow: &DocumentWorkflow,
        expected_version: Version,
    ) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct DocumentWorkflowRow {
    id: Uuid,
    document_type: String,
    document_id: Uuid,
    definition_id: Uuid,
    current_state: String,
    version: i32,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentWorkflowRow> for DocumentWorkflow {
    type Error = InfraError;

    fn try_from(row: DocumentWorkflowRow) -> Result<Self, Self::Error> {
        Ok(DocumentWorkflow::from_db(DocumentWorkflowRecord {
            id: DocumentWorkflowId::from_uuid(row.id),
            document: DocumentRef::new(
                row.document_type.parse()?,
                DocumentId::from_uuid(row.document_id),
            ),
            definition_id: WorkflowDefinitionId::from_uuid(row.definition_id),
            current_state: StateName::new(row.current_state)?,
            version: Version::try_from(row.version)?,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

const SELECT_BY_DOCUMENT: &str = r#"
    SELECT id, document_type, document_id, definition_id, current_state,
           version, created_by, created_at, updated_at
    FROM document_workflows
    WHERE document_type = $1 AND document_id = $2
"#;

#[derive(Debug, Clone)]
pub struct PostgresDocumentWorkflowRepository {
    pool: PgPool,
}

impl PostgresDocumentWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentWorkflowRepository for PostgresDocumentWorkflowRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%document))]
    async fn find_by_document(
        &self,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError> {
        sqlx::query_as::<_, DocumentWorkflowRow>(SELECT_BY_DOCUMENT)
            .bind(document.kind.document_type())
            .bind(document.id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(DocumentWorkflow::try_from)
            .transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document))]
    async fn find_by_document_for_update(
        &self,
        tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError> {
        sqlx::query_as::<_, DocumentWorkflowRow>(&format!("{SELECT_BY_DOCUMENT} FOR UPDATE"))
            .bind(document.kind.document_type())
            .bind(document.id.as_uuid())
            .fetch_optional(tx.conn())
            .await?
            .map(DocumentWorkflow::try_from)
            .transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(document = %workflow.document()))]
    async fn insert_if_absent(
        &self,
        tx: &mut TxContext,
        workflow: &DocumentWorkflow,
    ) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            INSERT INTO document_workflows (
                id, document_type, document_id, definition_id, current_state,
                version, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (document_type, document_id) DO NOTHING
            "#,
        )
        .bind(workflow.id().as_uuid())
        .bind(workflow.document().kind.document_type())
        .bind(workflow.document().id.as_uuid())
        .bind(workflow.definition_id().as_uuid())
        .bind(workflow.current_state().as_str())
        .bind(workflow.version().as_i32())
        .bind(workflow.created_by().map(UserId::as_uuid))
        .bind(workflow.created_at())
        .bind(workflow.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(id = %workflow.id(), expected_version = %expected_version)
    )]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        workflow: &DocumentWorkflow,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE document_workflows SET
                current_state = $1,
                version = $2,
                updated_at = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(workflow.current_state().as_str())
        .bind(workflow.version().as_i32())
        .bind(workflow.updated_at())
        .bind(workflow.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "DocumentWorkflow",
                workflow.id().to_string(),
            ));
        }

        Ok(())
    }
}

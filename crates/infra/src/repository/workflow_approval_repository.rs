//! # WorkflowApprovalRepository
//!
//! 承認記録の永続化。保留中の承認依頼は文書ワークフローごとに高々 1 件で、
//! 部分ユニークインデックスで DB 側でも保証している。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpflow_domain::{
    user::UserId,
    value_objects::Money,
    workflow::{DocumentWorkflowId, WorkflowApproval, WorkflowApprovalId, WorkflowApprovalRecord},
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait WorkflowApprovalRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, approval: &WorkflowApproval)
    -> Result<(), InfraError>;

    /// 保留中の承認依頼を行ロック付きで取得する
    async fn find_pending_for_update(
        &self,
        tx: &mut TxContext,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Option<WorkflowApproval>, InfraError>;

    /// 保留中の承認依頼に決定を書き込む
    ///
    /// # Errors
    ///
    /// - `InfraErrorKind::Conflict`: 対象が既に保留中でない
    async fn resolve(&self, tx: &mut TxContext, approval: &WorkflowApproval)
    -> Result<(), InfraError>;

    /// 文書ワークフローの承認履歴を依頼日時の昇順で取得する
    async fn find_by_workflow(
        &self,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Vec<WorkflowApproval>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct WorkflowApprovalRow {
    id: Uuid,
    document_workflow_id: Uuid,
    requested_by: Uuid,
    requested_at: DateTime<Utc>,
    approver: Option<Uuid>,
    responded_at: Option<DateTime<Utc>>,
    status: String,
    amount_at_request: Option<Decimal>,
    comments: Option<String>,
}

impl TryFrom<WorkflowApprovalRow> for WorkflowApproval {
    type Error = InfraError;

    fn try_from(row: WorkflowApprovalRow) -> Result<Self, Self::Error> {
        Ok(WorkflowApproval::from_db(WorkflowApprovalRecord {
            id: WorkflowApprovalId::from_uuid(row.id),
            document_workflow_id: DocumentWorkflowId::from_uuid(row.document_workflow_id),
            requested_by: UserId::from_uuid(row.requested_by),
            requested_at: row.requested_at,
            approver: row.approver.map(UserId::from_uuid),
            responded_at: row.responded_at,
            status: row.status.parse()?,
            amount_at_request: row.amount_at_request.map(Money::new).transpose()?,
            comments: row.comments,
        })?)
    }
}

const APPROVAL_COLUMNS: &str = r#"
    id, document_workflow_id, requested_by, requested_at, approver,
    responded_at, status, amount_at_request, comments
"#;

#[derive(Debug, Clone)]
pub struct PostgresWorkflowApprovalRepository {
    pool: PgPool,
}

impl PostgresWorkflowApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowApprovalRepository for PostgresWorkflowApprovalRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(id = %approval.id()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        approval: &WorkflowApproval,
    ) -> Result<(), InfraError> {
        sqlx::query(&format!(
            "INSERT INTO workflow_approvals ({APPROVAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(approval.id().as_uuid())
        .bind(approval.document_workflow_id().as_uuid())
        .bind(approval.requested_by().as_uuid())
        .bind(approval.requested_at())
        .bind(approval.approver().map(UserId::as_uuid))
        .bind(approval.responded_at())
        .bind(approval.status().as_str())
        .bind(approval.amount_at_request().map(|m| m.amount()))
        .bind(approval.comments())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                InfraError::conflict(
                    "WorkflowApproval",
                    approval.document_workflow_id().to_string(),
                )
            } else {
                InfraError::from(e)
            }
        })?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_workflow_id))]
    async fn find_pending_for_update(
        &self,
        tx: &mut TxContext,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Option<WorkflowApproval>, InfraError> {
        sqlx::query_as::<_, WorkflowApprovalRow>(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM workflow_approvals \
             WHERE document_workflow_id = $1 AND status = 'pending' FOR UPDATE"
        ))
        .bind(document_workflow_id.as_uuid())
        .fetch_optional(tx.conn())
        .await?
        .map(WorkflowApproval::try_from)
        .transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %approval.id()))]
    async fn resolve(
        &self,
        tx: &mut TxContext,
        approval: &WorkflowApproval,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_approvals SET
                status = $1,
                approver = $2,
                responded_at = $3,
                comments = $4
            WHERE id = $5 AND status = 'pending'
            "#,
        )
        .bind(approval.status().as_str())
        .bind(approval.approver().map(UserId::as_uuid))
        .bind(approval.responded_at())
        .bind(approval.comments())
        .bind(approval.id().as_uuid())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "WorkflowApproval",
                approval.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document_workflow_id))]
    async fn find_by_workflow(
        &self,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Vec<WorkflowApproval>, InfraError> {
        sqlx::query_as::<_, WorkflowApprovalRow>(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM workflow_approvals \
             WHERE document_workflow_id = $1 ORDER BY requested_at, id"
        ))
        .bind(document_workflow_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WorkflowApproval::try_from)
        .collect()
    }
}

//! # WorkflowDefinitionRepository
//!
//! ワークフロー定義・状態・遷移の読み込みと、シード用の get-or-create。
//!
//! 読み込みは文書種別単位で定義・状態・遷移をまとめて [`WorkflowGraph`] にする。
//! get-or-create は一意キー（定義: `document_type`、状態: `(workflow_id, name)`、
//! 遷移: `(workflow_id, from_state, action)`）で既存行を探し、なければ挿入する。
//! 既存行の内容は更新しない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpflow_domain::{
    document::DocumentKind,
    permission::PermissionCode,
    value_objects::{ActionName, ColorCode, DisplayLabel, Money, StateName},
    workflow::{
        WorkflowDefinition,
        WorkflowDefinitionId,
        WorkflowDefinitionRecord,
        WorkflowGraph,
        WorkflowState,
        WorkflowStateId,
        WorkflowStateRecord,
        WorkflowTransition,
        WorkflowTransitionId,
        WorkflowTransitionRecord,
    },
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// get-or-create の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seeded<T> {
    Created(T),
    Existing(T),
}

impl<T> Seeded<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Created(v) | Self::Existing(v) => v,
        }
    }
}

#[async_trait]
pub trait WorkflowDefinitionRepository: Send + Sync {
    /// 文書種別のワークフローを状態・遷移ごと読み込む
    ///
    /// 定義がない場合は `Ok(None)`。
    async fn find_graph_by_kind(&self, kind: DocumentKind)
    -> Result<Option<WorkflowGraph>, InfraError>;

    async fn get_or_create_definition(
        &self,
        tx: &mut TxContext,
        definition: &WorkflowDefinition,
    ) -> Result<Seeded<WorkflowDefinition>, InfraError>;

    async fn get_or_create_state(
        &self,
        tx: &mut TxContext,
        state: &WorkflowState,
    ) -> Result<Seeded<WorkflowState>, InfraError>;

    async fn get_or_create_transition(
        &self,
        tx: &mut TxContext,
        transition: &WorkflowTransition,
    ) -> Result<Seeded<WorkflowTransition>, InfraError>;
}

// ===== 行構造体 =====

#[derive(sqlx::FromRow)]
struct WorkflowDefinitionRow {
    id: Uuid,
    document_type: String,
    name: String,
    initial_state: String,
    requires_approval: bool,
    approval_threshold: Option<Decimal>,
    approval_permission: Option<String>,
    reactivation_permission: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowDefinitionRow> for WorkflowDefinition {
    type Error = InfraError;

    fn try_from(row: WorkflowDefinitionRow) -> Result<Self, Self::Error> {
        Ok(WorkflowDefinition::from_db(WorkflowDefinitionRecord {
            id: WorkflowDefinitionId::from_uuid(row.id),
            document_kind: row.document_type.parse()?,
            name: DisplayLabel::new(row.name)?,
            initial_state: StateName::new(row.initial_state)?,
            requires_approval: row.requires_approval,
            approval_threshold: row.approval_threshold.map(Money::new).transpose()?,
            approval_permission: row.approval_permission.map(PermissionCode::new).transpose()?,
            reactivation_permission: row
                .reactivation_permission
                .map(PermissionCode::new)
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?)
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowStateRow {
    id: Uuid,
    workflow_id: Uuid,
    name: String,
    display_name: String,
    sort_order: i32,
    is_final: bool,
    requires_approval: bool,
    color_code: String,
}

impl TryFrom<WorkflowStateRow> for WorkflowState {
    type Error = InfraError;

    fn try_from(row: WorkflowStateRow) -> Result<Self, Self::Error> {
        Ok(WorkflowState::from_db(WorkflowStateRecord {
            id: WorkflowStateId::from_uuid(row.id),
            workflow_id: WorkflowDefinitionId::from_uuid(row.workflow_id),
            name: StateName::new(row.name)?,
            display_name: DisplayLabel::new(row.display_name)?,
            order: row.sort_order,
            is_final: row.is_final,
            requires_approval: row.requires_approval,
            color_code: ColorCode::new(row.color_code)?,
        })?)
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowTransitionRow {
    id: Uuid,
    workflow_id: Uuid,
    from_state: String,
    to_state: String,
    action: String,
    name: String,
    required_permission: Option<String>,
    approval_effect: String,
    button_color: String,
}

impl TryFrom<WorkflowTransitionRow> for WorkflowTransition {
    type Error = InfraError;

    fn try_from(row: WorkflowTransitionRow) -> Result<Self, Self::Error> {
        Ok(WorkflowTransition::new(WorkflowTransitionRecord {
            id: WorkflowTransitionId::from_uuid(row.id),
            workflow_id: WorkflowDefinitionId::from_uuid(row.workflow_id),
            from_state: StateName::new(row.from_state)?,
            to_state: StateName::new(row.to_state)?,
            action: ActionName::new(row.action)?,
            name: DisplayLabel::new(row.name)?,
            required_permission: row.required_permission.map(PermissionCode::new).transpose()?,
            approval_effect: row.approval_effect.parse()?,
            button_color: row.button_color.parse()?,
        }))
    }
}

const DEFINITION_COLUMNS: &str = r#"
    id, document_type, name, initial_state, requires_approval, approval_threshold,
    approval_permission, reactivation_permission, created_at, updated_at
"#;

const STATE_COLUMNS: &str = r#"
    id, workflow_id, name, display_name, sort_order, is_final, requires_approval, color_code
"#;

const TRANSITION_COLUMNS: &str = r#"
    id, workflow_id, from_state, to_state, action, name,
    required_permission, approval_effect, button_color
"#;

/// PostgreSQL 実装
#[derive(Debug, Clone)]
pub struct PostgresWorkflowDefinitionRepository {
    pool: PgPool,
}

impl PostgresWorkflowDefinitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowDefinitionRepository for PostgresWorkflowDefinitionRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%kind))]
    async fn find_graph_by_kind(
        &self,
        kind: DocumentKind,
    ) -> Result<Option<WorkflowGraph>, InfraError> {
        let row = sqlx::query_as::<_, WorkflowDefinitionRow>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM workflow_definitions WHERE document_type = $1"
        ))
        .bind(kind.document_type())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let definition = WorkflowDefinition::try_from(row)?;

        let states = sqlx::query_as::<_, WorkflowStateRow>(&format!(
            "SELECT {STATE_COLUMNS} FROM workflow_states WHERE workflow_id = $1 ORDER BY sort_order, name"
        ))
        .bind(definition.id().as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WorkflowState::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let transitions = sqlx::query_as::<_, WorkflowTransitionRow>(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM workflow_transitions WHERE workflow_id = $1"
        ))
        .bind(definition.id().as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WorkflowTransition::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(WorkflowGraph::new(definition, states, transitions)?))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(kind = %definition.document_kind()))]
    async fn get_or_create_definition(
        &self,
        tx: &mut TxContext,
        definition: &WorkflowDefinition,
    ) -> Result<Seeded<WorkflowDefinition>, InfraError> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO workflow_definitions (
                id, document_type, name, initial_state, requires_approval, approval_threshold,
                approval_permission, reactivation_permission, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (document_type) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(definition.id().as_uuid())
        .bind(definition.document_kind().document_type())
        .bind(definition.name().as_str())
        .bind(definition.initial_state().as_str())
        .bind(definition.requires_approval())
        .bind(definition.approval_threshold().map(|m| m.amount()))
        .bind(definition.approval_permission().map(PermissionCode::as_str))
        .bind(definition.reactivation_permission().map(PermissionCode::as_str))
        .bind(definition.created_at())
        .bind(definition.updated_at())
        .fetch_optional(tx.conn())
        .await?;

        if inserted.is_some() {
            return Ok(Seeded::Created(definition.clone()));
        }

        let existing = sqlx::query_as::<_, WorkflowDefinitionRow>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM workflow_definitions WHERE document_type = $1"
        ))
        .bind(definition.document_kind().document_type())
        .fetch_one(tx.conn())
        .await?;
        Ok(Seeded::Existing(existing.try_into()?))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(state = %state.name()))]
    async fn get_or_create_state(
        &self,
        tx: &mut TxContext,
        state: &WorkflowState,
    ) -> Result<Seeded<WorkflowState>, InfraError> {
        let sort_order = i32::try_from(state.order())
            .map_err(|_| InfraError::invalid_input(format!("並び順が大きすぎます: {}", state.order())))?;
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO workflow_states (
                id, workflow_id, name, display_name, sort_order, is_final, requires_approval, color_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (workflow_id, name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(state.id().as_uuid())
        .bind(state.workflow_id().as_uuid())
        .bind(state.name().as_str())
        .bind(state.display_name().as_str())
        .bind(sort_order)
        .bind(state.is_final())
        .bind(state.requires_approval())
        .bind(state.color_code().as_str())
        .fetch_optional(tx.conn())
        .await?;

        if inserted.is_some() {
            return Ok(Seeded::Created(state.clone()));
        }

        let existing = sqlx::query_as::<_, WorkflowStateRow>(&format!(
            "SELECT {STATE_COLUMNS} FROM workflow_states WHERE workflow_id = $1 AND name = $2"
        ))
        .bind(state.workflow_id().as_uuid())
        .bind(state.name().as_str())
        .fetch_one(tx.conn())
        .await?;
        Ok(Seeded::Existing(existing.try_into()?))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(action = %transition.action()))]
    async fn get_or_create_transition(
        &self,
        tx: &mut TxContext,
        transition: &WorkflowTransition,
    ) -> Result<Seeded<WorkflowTransition>, InfraError> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO workflow_transitions (
                id, workflow_id, from_state, to_state, action, name,
                required_permission, approval_effect, button_color
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (workflow_id, from_state, action) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(transition.id().as_uuid())
        .bind(transition.workflow_id().as_uuid())
        .bind(transition.from_state().as_str())
        .bind(transition.to_state().as_str())
        .bind(transition.action().as_str())
        .bind(transition.name().as_str())
        .bind(transition.required_permission().map(PermissionCode::as_str))
        .bind(transition.approval_effect().as_str())
        .bind(transition.button_color().to_string())
        .fetch_optional(tx.conn())
        .await?;

        if inserted.is_some() {
            return Ok(Seeded::Created(transition.clone()));
        }

        let existing = sqlx::query_as::<_, WorkflowTransitionRow>(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM workflow_transitions \
             WHERE workflow_id = $1 AND from_state = $2 AND action = $3"
        ))
        .bind(transition.workflow_id().as_uuid())
        .bind(transition.from_state().as_str())
        .bind(transition.action().as_str())
        .fetch_one(tx.conn())
        .await?;
        Ok(Seeded::Existing(existing.try_into()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seededの作成判定と中身の取り出し() {
        let created = Seeded::Created(1);
        let existing = Seeded::Existing(2);

        assert!(created.is_created());
        assert!(!existing.is_created());
        assert_eq!(existing.into_inner(), 2);
    }
}

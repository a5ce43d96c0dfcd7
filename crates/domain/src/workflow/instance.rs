//! # 文書ワークフロー
//!
//! 1 件の業務文書に結び付いた実行中のワークフロー。現在状態を保持し、
//! 遷移のたびに `version` を進める（楽観的ロック）。
//!
//! 文書 1 件につきインスタンスは高々 1 件（`document` で一意）。

use chrono::{DateTime, Utc};

use super::{definition::WorkflowDefinitionId, state::WorkflowState};
use crate::{
    DomainError,
    document::DocumentRef,
    user::UserId,
    value_objects::{StateName, Version},
};

define_uuid_id! {
    /// 文書ワークフロー ID
    pub struct DocumentWorkflowId;
}

/// 文書ワークフローエンティティ
///
/// # 不変条件
///
/// - `current_state` は `definition_id` の定義に属する状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWorkflow {
    id: DocumentWorkflowId,
    document: DocumentRef,
    definition_id: WorkflowDefinitionId,
    current_state: StateName,
    version: Version,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 文書ワークフローの新規作成パラメータ
pub struct NewDocumentWorkflow<'a> {
    pub id: DocumentWorkflowId,
    pub document: DocumentRef,
    pub definition_id: WorkflowDefinitionId,
    pub initial_state: &'a WorkflowState,
    pub created_by: Option<UserId>,
    pub now: DateTime<Utc>,
}

/// 文書ワークフローの DB 復元パラメータ
pub struct DocumentWorkflowRecord {
    pub id: DocumentWorkflowId,
    pub document: DocumentRef,
    pub definition_id: WorkflowDefinitionId,
    pub current_state: StateName,
    pub version: Version,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn ensure_same_workflow(
    definition_id: &WorkflowDefinitionId,
    state: &WorkflowState,
) -> Result<(), DomainError> {
    if state.workflow_id() != definition_id {
        return Err(DomainError::Validation(format!(
            "状態 {} はこのワークフローに属していません",
            state.name()
        )));
    }
    Ok(())
}

impl DocumentWorkflow {
    /// 初期状態の文書ワークフローを作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 初期状態が別の定義に属している
    pub fn new(params: NewDocumentWorkflow<'_>) -> Result<Self, DomainError> {
        ensure_same_workflow(&params.definition_id, params.initial_state)?;
        Ok(Self {
            id: params.id,
            document: params.document,
            definition_id: params.definition_id,
            current_state: params.initial_state.name().clone(),
            version: Version::initial(),
            created_by: params.created_by,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    pub fn from_db(record: DocumentWorkflowRecord) -> Self {
        Self {
            id: record.id,
            document: record.document,
            definition_id: record.definition_id,
            current_state: record.current_state,
            version: record.version,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &DocumentWorkflowId {
        &self.id
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn definition_id(&self) -> &WorkflowDefinitionId {
        &self.definition_id
    }

    pub fn current_state(&self) -> &StateName {
        &self.current_state
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_by(&self) -> Option<&UserId> {
        self.created_by.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 指定状態へ遷移した新しいインスタンスを返す
    ///
    /// 遷移表による可否判定は呼び出し側（[`WorkflowGraph`](super::WorkflowGraph)）の責務。
    /// ここでは遷移先が同じ定義に属することだけを保証する。
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 遷移先が別の定義に属している
    pub fn transitioned(self, state: &WorkflowState, now: DateTime<Utc>) -> Result<Self, DomainError> {
        ensure_same_workflow(&self.definition_id, state)?;
        Ok(Self {
            current_state: state.name().clone(),
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }
}

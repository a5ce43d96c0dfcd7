//! # ワークフロー状態
//!
//! 定義の状態グラフ上のノード。表示名、並び順、終端フラグ、
//! 承認チェックポイントフラグ、表示色を持つ。

use serde::Serialize;

use super::definition::WorkflowDefinitionId;
use crate::{
    DomainError,
    value_objects::{ColorCode, DisplayLabel, StateName},
};

define_uuid_id! {
    /// ワークフロー状態 ID
    pub struct WorkflowStateId;
}

/// ワークフロー状態エンティティ
///
/// 並び順は型（`u32`）で非負を保証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    id: WorkflowStateId,
    workflow_id: WorkflowDefinitionId,
    name: StateName,
    display_name: DisplayLabel,
    order: u32,
    is_final: bool,
    requires_approval: bool,
    color_code: ColorCode,
}

/// ワークフロー状態の作成パラメータ
pub struct NewWorkflowState {
    pub id: WorkflowStateId,
    pub workflow_id: WorkflowDefinitionId,
    pub name: StateName,
    pub display_name: DisplayLabel,
    pub order: u32,
    pub is_final: bool,
    pub requires_approval: bool,
    pub color_code: ColorCode,
}

/// ワークフロー状態の DB 復元パラメータ
///
/// DB の `sort_order` は `INTEGER` のため、復元時に非負を検証する。
pub struct WorkflowStateRecord {
    pub id: WorkflowStateId,
    pub workflow_id: WorkflowDefinitionId,
    pub name: StateName,
    pub display_name: DisplayLabel,
    pub order: i32,
    pub is_final: bool,
    pub requires_approval: bool,
    pub color_code: ColorCode,
}

impl WorkflowState {
    pub fn new(params: NewWorkflowState) -> Self {
        Self {
            id: params.id,
            workflow_id: params.workflow_id,
            name: params.name,
            display_name: params.display_name,
            order: params.order,
            is_final: params.is_final,
            requires_approval: params.requires_approval,
            color_code: params.color_code,
        }
    }

    /// # Errors
    ///
    /// - `DomainError::Validation`: 並び順が負
    pub fn from_db(record: WorkflowStateRecord) -> Result<Self, DomainError> {
        let order = u32::try_from(record.order).map_err(|_| {
            DomainError::Validation(format!(
                "状態 {} の並び順は 0 以上である必要があります: {}",
                record.name, record.order
            ))
        })?;
        Ok(Self {
            id: record.id,
            workflow_id: record.workflow_id,
            name: record.name,
            display_name: record.display_name,
            order,
            is_final: record.is_final,
            requires_approval: record.requires_approval,
            color_code: record.color_code,
        })
    }

    pub fn id(&self) -> &WorkflowStateId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowDefinitionId {
        &self.workflow_id
    }

    pub fn name(&self) -> &StateName {
        &self.name
    }

    pub fn display_name(&self) -> &DisplayLabel {
        &self.display_name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn color_code(&self) -> &ColorCode {
        &self.color_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order: i32) -> WorkflowStateRecord {
        WorkflowStateRecord {
            id: WorkflowStateId::new(),
            workflow_id: WorkflowDefinitionId::new(),
            name: StateName::new("draft").unwrap(),
            display_name: DisplayLabel::new("Draft").unwrap(),
            order,
            is_final: false,
            requires_approval: false,
            color_code: ColorCode::default(),
        }
    }

    #[test]
    fn test_負の並び順は復元できない() {
        assert!(WorkflowState::from_db(record(-1)).is_err());
    }

    #[test]
    fn test_並び順0は復元できる() {
        let state = WorkflowState::from_db(record(0)).unwrap();
        assert_eq!(state.order(), 0);
    }
}

//! # ワークフロー遷移
//!
//! 同一定義内の 2 状態を結ぶ有向辺。`execute_action` はこの辺を
//! `(遷移元状態, アクション名)` で引き、辺に宣言された権限と承認効果を適用する。

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::definition::{WorkflowDefinition, WorkflowDefinitionId};
use crate::{
    DomainError,
    permission::PermissionCode,
    value_objects::{ActionName, ButtonColor, DisplayLabel, StateName},
};

define_uuid_id! {
    /// ワークフロー遷移 ID
    pub struct WorkflowTransitionId;
}

/// 遷移が承認記録に与える効果
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalEffect {
    /// 状態のみ変更する
    #[default]
    None,
    /// 承認依頼を作成する（承認が必要な文書でのみ提示）
    Request,
    /// 承認済みの記録を作成する（承認が不要な文書でのみ提示）
    AutoApprove,
    /// 保留中の承認依頼を承認する
    Approve,
    /// 保留中の承認依頼を却下する
    Reject,
    /// 保留中の承認依頼を取り下げる
    Withdraw,
}

impl ApprovalEffect {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 承認者として判断する遷移か（承認権限と承認上限の対象）
    pub fn is_decision(&self) -> bool {
        matches!(self, Self::Approve | Self::Reject)
    }

    /// 文書の承認要否に応じて提示してよい遷移か
    pub fn is_offered(&self, approval_needed: bool) -> bool {
        match self {
            Self::Request => approval_needed,
            Self::AutoApprove => !approval_needed,
            _ => true,
        }
    }
}

impl FromStr for ApprovalEffect {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "request" => Ok(Self::Request),
            "auto_approve" => Ok(Self::AutoApprove),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "withdraw" => Ok(Self::Withdraw),
            _ => Err(DomainError::Validation(format!("不正な承認効果: {s}"))),
        }
    }
}

/// ワークフロー遷移エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTransition {
    id: WorkflowTransitionId,
    workflow_id: WorkflowDefinitionId,
    from_state: StateName,
    to_state: StateName,
    action: ActionName,
    name: DisplayLabel,
    required_permission: Option<PermissionCode>,
    approval_effect: ApprovalEffect,
    button_color: ButtonColor,
}

/// ワークフロー遷移の作成・復元パラメータ
pub struct WorkflowTransitionRecord {
    pub id: WorkflowTransitionId,
    pub workflow_id: WorkflowDefinitionId,
    pub from_state: StateName,
    pub to_state: StateName,
    pub action: ActionName,
    pub name: DisplayLabel,
    pub required_permission: Option<PermissionCode>,
    pub approval_effect: ApprovalEffect,
    pub button_color: ButtonColor,
}

impl WorkflowTransition {
    pub fn new(record: WorkflowTransitionRecord) -> Self {
        Self {
            id: record.id,
            workflow_id: record.workflow_id,
            from_state: record.from_state,
            to_state: record.to_state,
            action: record.action,
            name: record.name,
            required_permission: record.required_permission,
            approval_effect: record.approval_effect,
            button_color: record.button_color,
        }
    }

    pub fn id(&self) -> &WorkflowTransitionId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowDefinitionId {
        &self.workflow_id
    }

    pub fn from_state(&self) -> &StateName {
        &self.from_state
    }

    pub fn to_state(&self) -> &StateName {
        &self.to_state
    }

    pub fn action(&self) -> &ActionName {
        &self.action
    }

    /// ボタンラベル
    pub fn name(&self) -> &DisplayLabel {
        &self.name
    }

    pub fn required_permission(&self) -> Option<&PermissionCode> {
        self.required_permission.as_ref()
    }

    pub fn approval_effect(&self) -> ApprovalEffect {
        self.approval_effect
    }

    pub fn button_color(&self) -> ButtonColor {
        self.button_color
    }

    /// 承認依頼を伴う遷移か
    pub fn requires_approval(&self) -> bool {
        self.approval_effect == ApprovalEffect::Request
    }

    /// 実際に要求される権限コード
    ///
    /// 承認・却下の辺に権限が宣言されていない場合は、定義の承認権限を要求する。
    pub fn effective_permission<'a>(
        &'a self,
        definition: &'a WorkflowDefinition,
    ) -> Option<&'a PermissionCode> {
        match self.required_permission.as_ref() {
            Some(code) => Some(code),
            None if self.approval_effect.is_decision() => definition.approval_permission(),
            None => None,
        }
    }
}

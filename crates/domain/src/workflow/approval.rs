//! # ワークフロー承認
//!
//! 文書ワークフローに対する承認依頼 1 件ごとの監査記録。
//!
//! 状態は ADT で表現し、`responded_at` が「保留中以外のときだけ存在する」ことを
//! 型で保証する。保留中の依頼は承認・却下・取り下げのいずれかで一度だけ応答される。

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::instance::DocumentWorkflowId;
use crate::{DomainError, user::UserId, value_objects::Money};

define_uuid_id! {
    /// ワークフロー承認 ID
    pub struct WorkflowApprovalId;
}

/// 承認ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl FromStr for ApprovalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(DomainError::Validation(format!("不正な承認ステータス: {s}"))),
        }
    }
}

/// 承認の状態（ADT）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalState {
    Pending,
    Approved(DecidedState),
    Rejected(DecidedState),
    /// 依頼者による取り下げ（差し戻し）。承認者はいない
    Withdrawn { responded_at: DateTime<Utc> },
}

/// 承認者が判断した状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecidedState {
    pub approver:     UserId,
    pub responded_at: DateTime<Utc>,
}

/// ワークフロー承認エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowApproval {
    id: WorkflowApprovalId,
    document_workflow_id: DocumentWorkflowId,
    requested_by: UserId,
    requested_at: DateTime<Utc>,
    amount_at_request: Option<Money>,
    comments: Option<String>,
    state: ApprovalState,
}

/// 承認依頼の作成パラメータ
pub struct NewWorkflowApproval {
    pub id: WorkflowApprovalId,
    pub document_workflow_id: DocumentWorkflowId,
    pub requested_by: UserId,
    pub amount_at_request: Option<Money>,
    pub comments: Option<String>,
    pub now: DateTime<Utc>,
}

/// 承認の DB 復元パラメータ（フラット構造）
pub struct WorkflowApprovalRecord {
    pub id: WorkflowApprovalId,
    pub document_workflow_id: DocumentWorkflowId,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub approver: Option<UserId>,
    pub responded_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    pub amount_at_request: Option<Money>,
    pub comments: Option<String>,
}

/// 閾値未満で自動承認したときの固定コメント
pub fn auto_approval_comment(document_no: &str) -> String {
    format!("{document_no} は承認閾値未満のため自動承認されました")
}

impl WorkflowApproval {
    /// 保留中の承認依頼を作成する
    pub fn new_pending(params: NewWorkflowApproval) -> Self {
        Self {
            id: params.id,
            document_workflow_id: params.document_workflow_id,
            requested_by: params.requested_by,
            requested_at: params.now,
            amount_at_request: params.amount_at_request,
            comments: params.comments,
            state: ApprovalState::Pending,
        }
    }

    /// 承認済みの記録を作成する（閾値未満の自動承認）
    ///
    /// 依頼者と承認者は同一人物になる。
    pub fn auto_approved(params: NewWorkflowApproval) -> Self {
        let approver = params.requested_by.clone();
        let now = params.now;
        Self {
            state: ApprovalState::Approved(DecidedState {
                approver,
                responded_at: now,
            }),
            ..Self::new_pending(params)
        }
    }

    /// # Errors
    ///
    /// - `DomainError::Validation`: ステータスと承認者・応答日時の組み合わせが不正
    pub fn from_db(record: WorkflowApprovalRecord) -> Result<Self, DomainError> {
        let missing = |field: &str| {
            DomainError::Validation(format!(
                "{} の承認記録には {} が必要です",
                record.status, field
            ))
        };

        let state = match record.status {
            ApprovalStatus::Pending => {
                if record.responded_at.is_some() {
                    return Err(DomainError::Validation(
                        "保留中の承認記録に responded_at は設定できません".to_string(),
                    ));
                }
                ApprovalState::Pending
            }
            ApprovalStatus::Approved | ApprovalStatus::Rejected => {
                let decided = DecidedState {
                    approver:     record.approver.clone().ok_or_else(|| missing("approver"))?,
                    responded_at: record.responded_at.ok_or_else(|| missing("responded_at"))?,
                };
                if record.status == ApprovalStatus::Approved {
                    ApprovalState::Approved(decided)
                } else {
                    ApprovalState::Rejected(decided)
                }
            }
            ApprovalStatus::Withdrawn => ApprovalState::Withdrawn {
                responded_at: record.responded_at.ok_or_else(|| missing("responded_at"))?,
            },
        };

        Ok(Self {
            id: record.id,
            document_workflow_id: record.document_workflow_id,
            requested_by: record.requested_by,
            requested_at: record.requested_at,
            amount_at_request: record.amount_at_request,
            comments: record.comments,
            state,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &WorkflowApprovalId {
        &self.id
    }

    pub fn document_workflow_id(&self) -> &DocumentWorkflowId {
        &self.document_workflow_id
    }

    pub fn requested_by(&self) -> &UserId {
        &self.requested_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn amount_at_request(&self) -> Option<Money> {
        self.amount_at_request
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn state(&self) -> &ApprovalState {
        &self.state
    }

    pub fn status(&self) -> ApprovalStatus {
        match &self.state {
            ApprovalState::Pending => ApprovalStatus::Pending,
            ApprovalState::Approved(_) => ApprovalStatus::Approved,
            ApprovalState::Rejected(_) => ApprovalStatus::Rejected,
            ApprovalState::Withdrawn { .. } => ApprovalStatus::Withdrawn,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ApprovalState::Pending)
    }

    pub fn approver(&self) -> Option<&UserId> {
        match &self.state {
            ApprovalState::Approved(s) | ApprovalState::Rejected(s) => Some(&s.approver),
            ApprovalState::Pending | ApprovalState::Withdrawn { .. } => None,
        }
    }

    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ApprovalState::Approved(s) | ApprovalState::Rejected(s) => Some(s.responded_at),
            ApprovalState::Withdrawn { responded_at } => Some(*responded_at),
            ApprovalState::Pending => None,
        }
    }

    // 状態遷移メソッド

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::Validation(format!(
                "保留中ではない承認には応答できません（現在: {}）",
                self.status()
            )));
        }
        Ok(())
    }

    /// 承認する
    ///
    /// コメントが指定された場合は依頼時のコメントを置き換える。
    pub fn approved(
        self,
        approver: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_pending()?;
        Ok(Self {
            comments: comment.or(self.comments),
            state: ApprovalState::Approved(DecidedState {
                approver,
                responded_at: now,
            }),
            ..self
        })
    }

    /// 却下する
    pub fn rejected(
        self,
        approver: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_pending()?;
        Ok(Self {
            comments: comment.or(self.comments),
            state: ApprovalState::Rejected(DecidedState {
                approver,
                responded_at: now,
            }),
            ..self
        })
    }

    /// 取り下げる（保留中の依頼を下書きに差し戻したとき）
    pub fn withdrawn(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_pending()?;
        Ok(Self {
            state: ApprovalState::Withdrawn { responded_at: now },
            ..self
        })
    }
}

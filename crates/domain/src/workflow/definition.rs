//! # ワークフロー定義
//!
//! 文書種別ごとに 1 件のワークフロー設定。初期状態、承認要否、
//! 承認が必須となる金額閾値、承認・再開に必要な権限コードを持つ。

use chrono::{DateTime, Utc};

use crate::{
    DomainError,
    document::DocumentKind,
    permission::PermissionCode,
    value_objects::{DisplayLabel, Money, StateName},
};

define_uuid_id! {
    /// ワークフロー定義 ID
    pub struct WorkflowDefinitionId;
}

/// ワークフロー定義エンティティ
///
/// # 不変条件
///
/// - `approval_threshold` は設定されている場合 0 より大きい
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
    id: WorkflowDefinitionId,
    document_kind: DocumentKind,
    name: DisplayLabel,
    initial_state: StateName,
    requires_approval: bool,
    approval_threshold: Option<Money>,
    approval_permission: Option<PermissionCode>,
    reactivation_permission: Option<PermissionCode>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// ワークフロー定義の新規作成パラメータ
pub struct NewWorkflowDefinition {
    pub id: WorkflowDefinitionId,
    pub document_kind: DocumentKind,
    pub name: DisplayLabel,
    pub initial_state: StateName,
    pub requires_approval: bool,
    pub approval_threshold: Option<Money>,
    pub approval_permission: Option<PermissionCode>,
    pub reactivation_permission: Option<PermissionCode>,
    pub now: DateTime<Utc>,
}

/// ワークフロー定義の DB 復元パラメータ
pub struct WorkflowDefinitionRecord {
    pub id: WorkflowDefinitionId,
    pub document_kind: DocumentKind,
    pub name: DisplayLabel,
    pub initial_state: StateName,
    pub requires_approval: bool,
    pub approval_threshold: Option<Money>,
    pub approval_permission: Option<PermissionCode>,
    pub reactivation_permission: Option<PermissionCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_threshold(threshold: Option<Money>) -> Result<(), DomainError> {
    match threshold {
        Some(amount) if amount.is_zero() => Err(DomainError::Validation(
            "承認閾値は 0 より大きい必要があります".to_string(),
        )),
        _ => Ok(()),
    }
}

impl WorkflowDefinition {
    /// 新しいワークフロー定義を作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 閾値が 0
    pub fn new(params: NewWorkflowDefinition) -> Result<Self, DomainError> {
        validate_threshold(params.approval_threshold)?;
        Ok(Self {
            id: params.id,
            document_kind: params.document_kind,
            name: params.name,
            initial_state: params.initial_state,
            requires_approval: params.requires_approval,
            approval_threshold: params.approval_threshold,
            approval_permission: params.approval_permission,
            reactivation_permission: params.reactivation_permission,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// 既存のデータから復元する
    pub fn from_db(record: WorkflowDefinitionRecord) -> Result<Self, DomainError> {
        validate_threshold(record.approval_threshold)?;
        Ok(Self {
            id: record.id,
            document_kind: record.document_kind,
            name: record.name,
            initial_state: record.initial_state,
            requires_approval: record.requires_approval,
            approval_threshold: record.approval_threshold,
            approval_permission: record.approval_permission,
            reactivation_permission: record.reactivation_permission,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &WorkflowDefinitionId {
        &self.id
    }

    pub fn document_kind(&self) -> DocumentKind {
        self.document_kind
    }

    pub fn name(&self) -> &DisplayLabel {
        &self.name
    }

    pub fn initial_state(&self) -> &StateName {
        &self.initial_state
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn approval_threshold(&self) -> Option<Money> {
        self.approval_threshold
    }

    pub fn approval_permission(&self) -> Option<&PermissionCode> {
        self.approval_permission.as_ref()
    }

    pub fn reactivation_permission(&self) -> Option<&PermissionCode> {
        self.reactivation_permission.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 指定金額の文書に承認が必要か判定する
    ///
    /// 承認不要の定義、または閾値未設定の場合は常に `false`。
    /// 閾値ちょうどの金額は承認が必要。
    pub fn approval_required_for(&self, amount: Money) -> bool {
        match self.approval_threshold {
            Some(threshold) if self.requires_approval => amount >= threshold,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn params(
        requires_approval: bool,
        threshold: Option<Money>,
        now: DateTime<Utc>,
    ) -> NewWorkflowDefinition {
        NewWorkflowDefinition {
            id: WorkflowDefinitionId::new(),
            document_kind: DocumentKind::PurchaseOrder,
            name: DisplayLabel::new("Purchase Order Workflow").unwrap(),
            initial_state: StateName::new("draft").unwrap(),
            requires_approval,
            approval_threshold: threshold,
            approval_permission: Some(PermissionCode::new("approve_purchase_orders").unwrap()),
            reactivation_permission: Some(PermissionCode::new("reactivate_documents").unwrap()),
            now,
        }
    }

    #[rstest]
    fn test_閾値0の定義は作成できない(now: DateTime<Utc>) {
        let result = WorkflowDefinition::new(params(true, Some(Money::zero()), now));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    #[case(4999, false)]
    #[case(5000, true)]
    #[case(5001, true)]
    fn test_閾値との比較(now: DateTime<Utc>, #[case] amount: u32, #[case] expected: bool) {
        let definition =
            WorkflowDefinition::new(params(true, Some(Money::from_major(5000)), now)).unwrap();

        assert_eq!(
            definition.approval_required_for(Money::from_major(amount)),
            expected
        );
    }

    #[rstest]
    fn test_承認不要の定義は金額によらず承認不要(now: DateTime<Utc>) {
        let definition =
            WorkflowDefinition::new(params(false, Some(Money::from_major(5000)), now)).unwrap();

        assert!(!definition.approval_required_for(Money::from_major(1_000_000)));
    }

    #[rstest]
    fn test_閾値未設定の定義は承認不要(now: DateTime<Utc>) {
        let definition = WorkflowDefinition::new(params(true, None, now)).unwrap();

        assert!(!definition.approval_required_for(Money::from_major(1_000_000)));
    }
}

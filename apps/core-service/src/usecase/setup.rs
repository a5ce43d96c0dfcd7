//! # ワークフローのシード
//!
//! 文書種別ごとの標準ワークフロー（定義・状態・遷移）を [`WorkflowBlueprint`] として持ち、
//! DB に冪等に投入する。
//!
//! 投入は一意キーによる get-or-create で行い、既存行の内容は変更しない。
//! 何度実行しても結果は同じになる。

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use erpflow_domain::{
    DomainError,
    clock::Clock,
    document::DocumentKind,
    permission::PermissionCode,
    value_objects::{ActionName, ButtonColor, ColorCode, DisplayLabel, Money, StateName},
    workflow::{
        ApprovalEffect,
        NewWorkflowDefinition,
        NewWorkflowState,
        WorkflowDefinition,
        WorkflowDefinitionId,
        WorkflowGraph,
        WorkflowState,
        WorkflowStateId,
        WorkflowTransition,
        WorkflowTransitionId,
        WorkflowTransitionRecord,
    },
};
use erpflow_infra::{TransactionManager, repository::WorkflowDefinitionRepository};
use erpflow_shared::{event_log::event, log_business_event};
use strum::IntoEnumIterator;

use crate::{
    error::CoreError,
    usecase::helpers::{begin_tx, commit_tx},
};

// =============================================================================
// ブループリント
// =============================================================================

/// 状態のブループリント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlueprint {
    pub name:              &'static str,
    pub display_name:      &'static str,
    pub order:             u32,
    pub color:             &'static str,
    pub is_final:          bool,
    pub requires_approval: bool,
}

impl StateBlueprint {
    fn new(name: &'static str, display_name: &'static str, order: u32, color: &'static str) -> Self {
        Self {
            name,
            display_name,
            order,
            color,
            is_final: false,
            requires_approval: false,
        }
    }

    fn final_state(self) -> Self {
        Self {
            is_final: true,
            ..self
        }
    }

    fn awaiting_approval(self) -> Self {
        Self {
            requires_approval: true,
            ..self
        }
    }
}

/// 遷移のブループリント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionBlueprint {
    pub from:       &'static str,
    pub to:         &'static str,
    pub action:     &'static str,
    pub label:      &'static str,
    pub color:      ButtonColor,
    pub effect:     ApprovalEffect,
    pub permission: Option<&'static str>,
}

impl TransitionBlueprint {
    fn new(
        from: &'static str,
        to: &'static str,
        action: &'static str,
        label: &'static str,
        color: ButtonColor,
    ) -> Self {
        Self {
            from,
            to,
            action,
            label,
            color,
            effect: ApprovalEffect::None,
            permission: None,
        }
    }

    fn effect(self, effect: ApprovalEffect) -> Self {
        Self { effect, ..self }
    }

    fn requiring(self, permission: &'static str) -> Self {
        Self {
            permission: Some(permission),
            ..self
        }
    }
}

/// 文書種別 1 つ分のワークフロー設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowBlueprint {
    pub kind: DocumentKind,
    pub name: &'static str,
    pub initial_state: &'static str,
    pub requires_approval: bool,
    /// 承認閾値（整数の金額）
    pub approval_threshold: Option<u32>,
    pub approval_permission: Option<&'static str>,
    pub reactivation_permission: Option<&'static str>,
    pub states: Vec<StateBlueprint>,
    pub transitions: Vec<TransitionBlueprint>,
}

impl WorkflowBlueprint {
    /// 文書種別の標準ワークフロー
    pub fn preset(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::SalesOrder => order_blueprint(
                kind,
                "Sales Order Approval Workflow",
                1000,
                "approve_sales_orders",
            ),
            DocumentKind::PurchaseOrder => order_blueprint(
                kind,
                "Purchase Order Approval Workflow",
                5000,
                "approve_purchase_orders",
            ),
            DocumentKind::Invoice => invoice_blueprint(),
            DocumentKind::Shipment => shipment_blueprint(),
        }
    }

    /// 全文書種別の標準ワークフロー
    pub fn presets() -> Vec<Self> {
        DocumentKind::iter().map(Self::preset).collect()
    }

    fn definition(&self, now: DateTime<Utc>) -> Result<WorkflowDefinition, DomainError> {
        WorkflowDefinition::new(NewWorkflowDefinition {
            id: WorkflowDefinitionId::new(),
            document_kind: self.kind,
            name: DisplayLabel::new(self.name)?,
            initial_state: StateName::new(self.initial_state)?,
            requires_approval: self.requires_approval,
            approval_threshold: self.approval_threshold.map(Money::from_major),
            approval_permission: self.approval_permission.map(PermissionCode::new).transpose()?,
            reactivation_permission: self
                .reactivation_permission
                .map(PermissionCode::new)
                .transpose()?,
            now,
        })
    }

    fn states(&self, workflow_id: &WorkflowDefinitionId) -> Result<Vec<WorkflowState>, DomainError> {
        self.states
            .iter()
            .map(|s| {
                Ok(WorkflowState::new(NewWorkflowState {
                    id: WorkflowStateId::new(),
                    workflow_id: workflow_id.clone(),
                    name: StateName::new(s.name)?,
                    display_name: DisplayLabel::new(s.display_name)?,
                    order: s.order,
                    is_final: s.is_final,
                    requires_approval: s.requires_approval,
                    color_code: ColorCode::new(s.color)?,
                }))
            })
            .collect()
    }

    fn transitions(
        &self,
        workflow_id: &WorkflowDefinitionId,
    ) -> Result<Vec<WorkflowTransition>, DomainError> {
        self.transitions
            .iter()
            .map(|t| {
                Ok(WorkflowTransition::new(WorkflowTransitionRecord {
                    id: WorkflowTransitionId::new(),
                    workflow_id: workflow_id.clone(),
                    from_state: StateName::new(t.from)?,
                    to_state: StateName::new(t.to)?,
                    action: ActionName::new(t.action)?,
                    name: DisplayLabel::new(t.label)?,
                    required_permission: t.permission.map(PermissionCode::new).transpose()?,
                    approval_effect: t.effect,
                    button_color: t.color,
                }))
            })
            .collect()
    }

    /// グラフとして組み立てる
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 名前の形式違反、または状態グラフの不変条件違反
    pub fn build(&self, now: DateTime<Utc>) -> Result<WorkflowGraph, DomainError> {
        let definition = self.definition(now)?;
        let states = self.states(definition.id())?;
        let transitions = self.transitions(definition.id())?;
        WorkflowGraph::new(definition, states, transitions)
    }
}

fn order_blueprint(
    kind: DocumentKind,
    name: &'static str,
    threshold: u32,
    approval_permission: &'static str,
) -> WorkflowBlueprint {
    use ButtonColor::*;
    const REACTIVATE: &str = "reactivate_documents";

    WorkflowBlueprint {
        kind,
        name,
        initial_state: "draft",
        requires_approval: true,
        approval_threshold: Some(threshold),
        approval_permission: Some(approval_permission),
        reactivation_permission: Some(REACTIVATE),
        states: vec![
            StateBlueprint::new("draft", "Draft", 0, "#6c757d"),
            StateBlueprint::new("pending_approval", "Pending Approval", 1, "#fd7e14")
                .awaiting_approval(),
            StateBlueprint::new("approved", "Approved", 2, "#20c997"),
            StateBlueprint::new("in_progress", "In Progress", 3, "#0d6efd"),
            StateBlueprint::new("complete", "Complete", 4, "#198754"),
            StateBlueprint::new("closed", "Closed", 5, "#495057").final_state(),
            StateBlueprint::new("rejected", "Rejected", 6, "#dc3545"),
        ],
        transitions: vec![
            TransitionBlueprint::new("draft", "pending_approval", "submit_approval", "Submit for Approval", Orange)
                .effect(ApprovalEffect::Request),
            TransitionBlueprint::new("draft", "approved", "auto_approve", "Auto-Approve & Start", Green)
                .effect(ApprovalEffect::AutoApprove),
            TransitionBlueprint::new("pending_approval", "approved", "approve", "Approve", Green)
                .effect(ApprovalEffect::Approve),
            TransitionBlueprint::new("pending_approval", "rejected", "reject", "Reject", Red)
                .effect(ApprovalEffect::Reject),
            TransitionBlueprint::new("pending_approval", "draft", "return_to_draft", "Return to Draft", Gray)
                .effect(ApprovalEffect::Withdraw),
            TransitionBlueprint::new("approved", "in_progress", "start", "Start Processing", Blue),
            TransitionBlueprint::new("approved", "draft", "reset_to_draft", "Reactivate", Orange)
                .requiring(REACTIVATE),
            TransitionBlueprint::new("in_progress", "complete", "complete", "Mark Complete", Green),
            TransitionBlueprint::new("in_progress", "draft", "reset_to_draft", "Reactivate", Orange)
                .requiring(REACTIVATE),
            TransitionBlueprint::new("complete", "closed", "close", "Close", Gray),
            TransitionBlueprint::new("complete", "in_progress", "reopen", "Reactivate", Orange)
                .requiring(REACTIVATE),
            TransitionBlueprint::new("closed", "in_progress", "reopen", "Reactivate", Orange)
                .requiring(REACTIVATE),
            TransitionBlueprint::new("rejected", "draft", "return_to_draft", "Return to Draft", Blue),
        ],
    }
}

fn invoice_blueprint() -> WorkflowBlueprint {
    use ButtonColor::*;

    WorkflowBlueprint {
        kind: DocumentKind::Invoice,
        name: "Standard Invoice Workflow",
        initial_state: "draft",
        requires_approval: true,
        approval_threshold: Some(1000),
        approval_permission: Some("invoice_approve"),
        reactivation_permission: Some("invoice_reactivate"),
        states: vec![
            StateBlueprint::new("draft", "Draft", 10, "#6c757d"),
            StateBlueprint::new("pending_approval", "Pending Approval", 20, "#fd7e14")
                .awaiting_approval(),
            StateBlueprint::new("approved", "Approved", 30, "#20c997"),
            StateBlueprint::new("sent", "Sent", 40, "#0d6efd"),
            StateBlueprint::new("partial_payment", "Partially Paid", 50, "#ffc107"),
            StateBlueprint::new("overdue", "Overdue", 55, "#dc3545"),
            StateBlueprint::new("paid", "Paid", 60, "#198754").final_state(),
            StateBlueprint::new("cancelled", "Cancelled", 70, "#495057").final_state(),
        ],
        transitions: vec![
            TransitionBlueprint::new("draft", "pending_approval", "submit_approval", "Submit for Approval", Orange)
                .effect(ApprovalEffect::Request),
            TransitionBlueprint::new("draft", "approved", "auto_approve", "Auto Approve", Green)
                .effect(ApprovalEffect::AutoApprove),
            TransitionBlueprint::new("draft", "cancelled", "cancel", "Cancel", Red),
            TransitionBlueprint::new("pending_approval", "approved", "approve", "Approve", Green)
                .effect(ApprovalEffect::Approve),
            // 却下された請求書は下書きに戻して修正する
            TransitionBlueprint::new("pending_approval", "draft", "reject", "Reject", Red)
                .effect(ApprovalEffect::Reject),
            TransitionBlueprint::new("pending_approval", "draft", "return_to_draft", "Return to Draft", Gray)
                .effect(ApprovalEffect::Withdraw),
            TransitionBlueprint::new("approved", "sent", "send", "Send to Customer", Blue),
            TransitionBlueprint::new("approved", "cancelled", "cancel", "Cancel", Red),
            TransitionBlueprint::new("sent", "paid", "pay", "Record Payment", Green),
            TransitionBlueprint::new("sent", "partial_payment", "partial_payment", "Partial Payment", Orange),
            TransitionBlueprint::new("sent", "overdue", "mark_overdue", "Mark Overdue", Red),
            TransitionBlueprint::new("partial_payment", "paid", "pay", "Complete Payment", Green),
            TransitionBlueprint::new("partial_payment", "overdue", "mark_overdue", "Mark Overdue", Red),
            TransitionBlueprint::new("overdue", "paid", "pay", "Record Payment", Green),
            TransitionBlueprint::new("overdue", "partial_payment", "partial_payment", "Partial Payment", Orange),
        ],
    }
}

fn shipment_blueprint() -> WorkflowBlueprint {
    use ButtonColor::*;

    WorkflowBlueprint {
        kind: DocumentKind::Shipment,
        name: "Standard Shipment Workflow",
        initial_state: "draft",
        requires_approval: false,
        approval_threshold: None,
        approval_permission: Some("shipment_approve"),
        reactivation_permission: Some("shipment_reactivate"),
        states: vec![
            StateBlueprint::new("draft", "Draft", 10, "#6c757d"),
            StateBlueprint::new("prepared", "Prepared", 20, "#fd7e14"),
            StateBlueprint::new("in_transit", "In Transit", 30, "#0d6efd"),
            StateBlueprint::new("delivered", "Delivered", 40, "#20c997"),
            StateBlueprint::new("returned", "Returned", 45, "#ffc107"),
            StateBlueprint::new("complete", "Complete", 50, "#198754").final_state(),
            StateBlueprint::new("cancelled", "Cancelled", 60, "#495057").final_state(),
        ],
        transitions: vec![
            TransitionBlueprint::new("draft", "prepared", "prepare", "Prepare Shipment", Blue),
            TransitionBlueprint::new("draft", "cancelled", "cancel", "Cancel", Red),
            TransitionBlueprint::new("prepared", "in_transit", "ship", "Ship", Blue),
            TransitionBlueprint::new("prepared", "cancelled", "cancel", "Cancel", Red),
            TransitionBlueprint::new("in_transit", "delivered", "deliver", "Mark Delivered", Green),
            TransitionBlueprint::new("in_transit", "returned", "return", "Mark Returned", Orange),
            TransitionBlueprint::new("delivered", "complete", "complete", "Complete", Green),
            TransitionBlueprint::new("delivered", "returned", "return", "Process Return", Orange),
            TransitionBlueprint::new("returned", "in_transit", "reship", "Reship", Blue),
            TransitionBlueprint::new("returned", "cancelled", "cancel", "Cancel Order", Red),
        ],
    }
}

// =============================================================================
// シード
// =============================================================================

/// シード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub kind: DocumentKind,
    pub definition_created: bool,
    pub states_created: usize,
    pub states_existing: usize,
    pub transitions_created: usize,
    pub transitions_existing: usize,
}

impl SeedReport {
    fn new(kind: DocumentKind, definition_created: bool) -> Self {
        Self {
            kind,
            definition_created,
            states_created: 0,
            states_existing: 0,
            transitions_created: 0,
            transitions_existing: 0,
        }
    }

    /// 何も作成しなかったか
    pub fn is_unchanged(&self) -> bool {
        !self.definition_created && self.states_created == 0 && self.transitions_created == 0
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: 定義 {}, 状態 作成 {} / 既存 {}, 遷移 作成 {} / 既存 {}",
            self.kind,
            if self.definition_created { "作成" } else { "既存" },
            self.states_created,
            self.states_existing,
            self.transitions_created,
            self.transitions_existing,
        )
    }
}

/// ワークフローシードのユースケース
pub struct SetupUseCaseImpl {
    definition_repo: Arc<dyn WorkflowDefinitionRepository>,
    clock: Arc<dyn Clock>,
    tx_manager: Arc<dyn TransactionManager>,
}

impl SetupUseCaseImpl {
    pub fn new(
        definition_repo: Arc<dyn WorkflowDefinitionRepository>,
        clock: Arc<dyn Clock>,
        tx_manager: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            definition_repo,
            clock,
            tx_manager,
        }
    }

    /// ブループリントを DB に投入する
    ///
    /// 定義が既に存在する場合、状態と遷移は既存の定義 ID に紐付けて get-or-create する。
    /// ブループリント自体が不正な場合は何も書き込まない。
    #[tracing::instrument(skip_all, fields(kind = %blueprint.kind))]
    pub async fn seed_workflow(&self, blueprint: &WorkflowBlueprint) -> Result<SeedReport, CoreError> {
        let now = self.clock.now();
        blueprint.build(now)?;

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;

        let seeded = self
            .definition_repo
            .get_or_create_definition(&mut tx, &blueprint.definition(now)?)
            .await?;
        let mut report = SeedReport::new(blueprint.kind, seeded.is_created());
        let definition = seeded.into_inner();

        for state in blueprint.states(definition.id())? {
            if self
                .definition_repo
                .get_or_create_state(&mut tx, &state)
                .await?
                .is_created()
            {
                report.states_created += 1;
            } else {
                report.states_existing += 1;
            }
        }

        for transition in blueprint.transitions(definition.id())? {
            if self
                .definition_repo
                .get_or_create_transition(&mut tx, &transition)
                .await?
                .is_created()
            {
                report.transitions_created += 1;
            } else {
                report.transitions_existing += 1;
            }
        }

        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::SETUP,
            event.action = event::action::WORKFLOW_SEEDED,
            event.entity_type = event::entity_type::WORKFLOW_DEFINITION,
            event.entity_id = %definition.id(),
            event.result = event::result::SUCCESS,
            states_created = report.states_created,
            transitions_created = report.transitions_created,
            "ワークフローを投入しました"
        );

        Ok(report)
    }

    /// 複数のブループリントを順に投入する
    pub async fn seed_all(&self, blueprints: &[WorkflowBlueprint]) -> Result<Vec<SeedReport>, CoreError> {
        let mut reports = Vec::with_capacity(blueprints.len());
        for blueprint in blueprints {
            reports.push(self.seed_workflow(blueprint).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use erpflow_domain::clock::FixedClock;
    use erpflow_infra::mock::{MockTransactionManager, MockWorkflowDefinitionRepository};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn build_sut(repo: &MockWorkflowDefinitionRepository) -> SetupUseCaseImpl {
        SetupUseCaseImpl::new(
            Arc::new(repo.clone()),
            Arc::new(FixedClock::new(now())),
            Arc::new(MockTransactionManager),
        )
    }

    #[rstest]
    #[case(DocumentKind::SalesOrder, 7, 13)]
    #[case(DocumentKind::PurchaseOrder, 7, 13)]
    #[case(DocumentKind::Invoice, 8, 15)]
    #[case(DocumentKind::Shipment, 7, 10)]
    fn test_標準ワークフローはグラフとして妥当(
        #[case] kind: DocumentKind,
        #[case] states: usize,
        #[case] transitions: usize,
    ) {
        let graph = WorkflowBlueprint::preset(kind).build(now()).unwrap();

        assert_eq!(graph.definition().document_kind(), kind);
        assert_eq!(graph.states().len(), states);
        assert_eq!(graph.transitions().len(), transitions);
        assert!(graph.initial_state().is_some());
    }

    #[test]
    fn test_presetsは全文書種別を含む() {
        let kinds: Vec<_> = WorkflowBlueprint::presets().iter().map(|b| b.kind).collect();

        assert_eq!(kinds, DocumentKind::iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_発注の閾値と権限() {
        let graph = WorkflowBlueprint::preset(DocumentKind::PurchaseOrder)
            .build(now())
            .unwrap();
        let definition = graph.definition();

        assert_eq!(definition.approval_threshold(), Some(Money::from_major(5000)));
        assert_eq!(
            definition.approval_permission().map(|p| p.as_str()),
            Some("approve_purchase_orders")
        );
        assert_eq!(
            definition.reactivation_permission().map(|p| p.as_str()),
            Some("reactivate_documents")
        );
    }

    #[test]
    fn test_重複した遷移を含むブループリントは不正() {
        let mut blueprint = WorkflowBlueprint::preset(DocumentKind::Shipment);
        blueprint.transitions.push(TransitionBlueprint::new(
            "draft",
            "cancelled",
            "cancel",
            "Cancel",
            ButtonColor::Red,
        ));

        assert!(blueprint.build(now()).is_err());
    }

    #[tokio::test]
    async fn test_初回のシードはすべて作成する() {
        let repo = MockWorkflowDefinitionRepository::new();
        let sut = build_sut(&repo);

        let report = sut
            .seed_workflow(&WorkflowBlueprint::preset(DocumentKind::Invoice))
            .await
            .unwrap();

        assert!(report.definition_created);
        assert_eq!(report.states_created, 8);
        assert_eq!(report.transitions_created, 15);
        assert_eq!(report.states_existing, 0);
        assert_eq!(repo.definition_count(), 1);
    }

    #[tokio::test]
    async fn test_シードは冪等() {
        let repo = MockWorkflowDefinitionRepository::new();
        let sut = build_sut(&repo);
        let blueprints = WorkflowBlueprint::presets();

        sut.seed_all(&blueprints).await.unwrap();
        let counts = (repo.definition_count(), repo.state_count(), repo.transition_count());
        let second = sut.seed_all(&blueprints).await.unwrap();

        assert!(second.iter().all(SeedReport::is_unchanged));
        assert_eq!(
            (repo.definition_count(), repo.state_count(), repo.transition_count()),
            counts
        );
        assert_eq!(counts, (4, 29, 51));
    }

    #[tokio::test]
    async fn test_シード後の定義からグラフを読み込める() {
        let repo = MockWorkflowDefinitionRepository::new();
        let sut = build_sut(&repo);

        sut.seed_workflow(&WorkflowBlueprint::preset(DocumentKind::Shipment))
            .await
            .unwrap();

        let graph = repo
            .find_graph_by_kind(DocumentKind::Shipment)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(graph.initial_state().unwrap().name().as_str(), "draft");
        assert!(!graph.definition().requires_approval());
    }
}

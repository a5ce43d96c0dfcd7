//! アクションの実行と再開
//!
//! 1 回のアクションは単一トランザクションで、文書行とワークフロー行を行ロックし、
//! 検証をすべて終えてから書き込む。ワークフロー行はバージョンチェック付きで更新し、
//! 文書の `doc_status` は常にワークフローの現在状態のミラーになる。

use chrono::{DateTime, Utc};
use erpflow_domain::{
    action::{ActionError, ActionParams},
    document::{DocStatus, Document, DocumentRef, WorkflowDocument},
    lifecycle,
    permission::{authorize, authorize_reactivation},
    user::Actor,
    value_objects::{ActionName, StateName},
    workflow::{
        ApprovalEffect,
        ApprovalStatus,
        DocumentWorkflow,
        NewWorkflowApproval,
        WorkflowApproval,
        WorkflowApprovalId,
        WorkflowGraph,
        WorkflowTransition,
        auto_approval_comment,
    },
};
use erpflow_infra::TxContext;
use erpflow_shared::{event_log::event, log_business_event};

use super::WorkflowUseCaseImpl;
use crate::{
    error::CoreError,
    usecase::helpers::{ConflictResultExt, FindResultExt, begin_tx, commit_tx},
};

/// アクション実行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub document:   Document,
    pub workflow:   DocumentWorkflow,
    pub transition: WorkflowTransition,
    /// 作成または決定された承認依頼
    pub approval:   Option<WorkflowApproval>,
}

/// 再開の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactivationOutcome {
    pub document: Document,
    /// ワークフロー定義がない文書種別は `None`
    pub workflow: Option<DocumentWorkflow>,
    pub status:   DocStatus,
}

/// 遷移に伴う承認依頼の書き込み
enum ApprovalChange {
    Insert(WorkflowApproval),
    Resolve(WorkflowApproval),
}

fn log_denied(document_ref: &DocumentRef, actor: &Actor, action: &str, err: &ActionError) {
    log_business_event!(
        event.category = event::category::WORKFLOW,
        event.action = event::action::WORKFLOW_TRANSITIONED,
        event.entity_type = event::entity_type::DOCUMENT,
        event.entity_id = %document_ref,
        event.actor_id = %actor.id(),
        event.result = event::result::FAILURE,
        workflow_action = action,
        reason = %err,
        "アクションの権限がありません"
    );
}

fn approval_event_action(status: ApprovalStatus) -> &'static str {
    match status {
        ApprovalStatus::Pending => event::action::APPROVAL_REQUESTED,
        ApprovalStatus::Approved => event::action::APPROVAL_APPROVED,
        ApprovalStatus::Rejected => event::action::APPROVAL_REJECTED,
        ApprovalStatus::Withdrawn => event::action::APPROVAL_WITHDRAWN,
    }
}

impl WorkflowUseCaseImpl {
    /// 文書にアクションを実行する
    ///
    /// # Errors
    ///
    /// - `ActionError::UnknownAction`: ワークフローに存在しないアクション
    /// - `ActionError::InvalidTransition`: 現在状態から実行できないアクション
    /// - `ActionError::PermissionDenied`: 権限不足、または承認上限超過
    /// - `ActionError::ConfigurationMissing`: ワークフロー定義・初期状態・遷移先の欠落
    /// - `ActionError::InvalidInput`: アクションパラメータの不備
    /// - `CoreError::Conflict`: 並行更新によるバージョン不一致
    #[tracing::instrument(skip_all, fields(document = %document_ref, action = %action))]
    pub async fn execute_action(
        &self,
        document_ref: &DocumentRef,
        action: &str,
        actor: &Actor,
        params: ActionParams,
    ) -> Result<TransitionOutcome, CoreError> {
        let action_name = ActionName::new(action)
            .map_err(|_| ActionError::UnknownAction(action.to_string()))?;
        let graph = self
            .load_graph(document_ref.kind)
            .await?
            .ok_or_else(|| {
                ActionError::ConfigurationMissing(format!(
                    "{} のワークフロー定義がありません",
                    document_ref.kind
                ))
            })?;
        let grants = self.permission_repo.find_by_user(actor.id()).await?;
        let now = self.clock.now();

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;

        let mut document = self
            .document_repo
            .find_for_update(&mut tx, document_ref)
            .await
            .or_not_found("文書")?;
        let workflow = self
            .locked_workflow(&mut tx, &graph, document_ref, Some(actor.id()))
            .await?
            .ok_or_else(|| {
                ActionError::ConfigurationMissing(format!(
                    "{} のワークフローに初期状態が設定されていません",
                    document_ref.kind
                ))
            })?;
        Self::ensure_same_definition(&graph, &workflow)?;

        let definition = graph.definition();
        let approval_needed = lifecycle::needs_approval(Some(definition), &document);
        let transition = graph.resolve_action(workflow.current_state(), &action_name, approval_needed)?;
        let effect = transition.approval_effect();

        let limit_amount = (effect == ApprovalEffect::Approve).then(|| document.total_amount());
        if let Err(e) = authorize(
            actor,
            transition.effective_permission(definition),
            &grants,
            limit_amount,
        ) {
            log_denied(document_ref, actor, action, &e);
            return Err(e.into());
        }

        let target = graph.state(transition.to_state()).ok_or_else(|| {
            ActionError::ConfigurationMissing(format!(
                "遷移先の状態「{}」が定義されていません",
                transition.to_state()
            ))
        })?;

        let approval_change = self
            .prepare_approval(&mut tx, effect, &workflow, &document, actor, &params, now)
            .await?;

        let from_state = workflow.current_state().clone();
        lifecycle::apply_transition(&mut document, target, &params, actor.id(), now)?;
        let expected_version = workflow.version();
        let workflow = workflow.transitioned(target, now)?;

        self.workflow_repo
            .update_with_version_check(&mut tx, &workflow, expected_version)
            .await
            .or_conflict("文書ワークフロー")?;
        self.document_repo.update(&mut tx, &document).await?;
        let approval = match approval_change {
            Some(ApprovalChange::Insert(approval)) => {
                self.approval_repo.insert(&mut tx, &approval).await?;
                Some(approval)
            }
            Some(ApprovalChange::Resolve(approval)) => {
                self.approval_repo
                    .resolve(&mut tx, &approval)
                    .await
                    .or_conflict("承認依頼")?;
                Some(approval)
            }
            None => None,
        };

        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::WORKFLOW_TRANSITIONED,
            event.entity_type = event::entity_type::DOCUMENT_WORKFLOW,
            event.entity_id = %workflow.id(),
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            document = %document_ref,
            workflow_action = action,
            from_state = %from_state,
            to_state = %workflow.current_state(),
            "ワークフローを遷移しました"
        );
        if let Some(approval) = &approval {
            log_business_event!(
                event.category = event::category::APPROVAL,
                event.action = approval_event_action(approval.status()),
                event.entity_type = event::entity_type::WORKFLOW_APPROVAL,
                event.entity_id = %approval.id(),
                event.actor_id = %actor.id(),
                event.result = event::result::SUCCESS,
                document = %document_ref,
                "承認依頼を更新しました"
            );
        }

        Ok(TransitionOutcome {
            document,
            workflow,
            transition: transition.clone(),
            approval,
        })
    }

    /// 遷移の承認効果に応じた承認依頼の変更を組み立てる
    ///
    /// 承認・却下・取り下げで保留中の依頼がない場合は何も書き込まない。
    #[allow(clippy::too_many_arguments)]
    async fn prepare_approval(
        &self,
        tx: &mut TxContext,
        effect: ApprovalEffect,
        workflow: &DocumentWorkflow,
        document: &Document,
        actor: &Actor,
        params: &ActionParams,
        now: DateTime<Utc>,
    ) -> Result<Option<ApprovalChange>, CoreError> {
        let new_approval = |comments: Option<String>| NewWorkflowApproval {
            id: WorkflowApprovalId::new(),
            document_workflow_id: workflow.id().clone(),
            requested_by: actor.id().clone(),
            amount_at_request: Some(document.total_amount()),
            comments,
            now,
        };

        let change = match effect {
            ApprovalEffect::None => None,
            ApprovalEffect::Request => Some(ApprovalChange::Insert(WorkflowApproval::new_pending(
                new_approval(params.comment.clone()),
            ))),
            ApprovalEffect::AutoApprove => {
                let comment = auto_approval_comment(&document.header().document_no);
                Some(ApprovalChange::Insert(WorkflowApproval::auto_approved(
                    new_approval(Some(comment)),
                )))
            }
            ApprovalEffect::Approve | ApprovalEffect::Reject | ApprovalEffect::Withdraw => {
                let Some(pending) = self
                    .approval_repo
                    .find_pending_for_update(tx, workflow.id())
                    .await?
                else {
                    return Ok(None);
                };
                let resolved = match effect {
                    ApprovalEffect::Approve => {
                        pending.approved(actor.id().clone(), params.comment.clone(), now)?
                    }
                    ApprovalEffect::Reject => {
                        pending.rejected(actor.id().clone(), params.comment.clone(), now)?
                    }
                    _ => pending.withdrawn(now)?,
                };
                Some(ApprovalChange::Resolve(resolved))
            }
        };
        Ok(change)
    }

    /// 完了・締め済みの文書を作業中に戻す
    ///
    /// 権限を先に確認し、その後でステータスの前提条件を確認する。
    /// ワークフローは再開後のステータスに対応する状態へ移す。対応する状態が
    /// 定義にない場合は初期状態に戻し、文書のステータスもそれに合わせる。
    ///
    /// # Errors
    ///
    /// - `ActionError::PermissionDenied`: 再開権限がない（権限コード未設定ならスーパーユーザーのみ）
    /// - `ActionError::PreconditionFailed`: 再開できないステータス
    /// - `CoreError::Conflict`: 並行更新によるバージョン不一致
    #[tracing::instrument(skip_all, fields(document = %document_ref))]
    pub async fn reactivate(
        &self,
        document_ref: &DocumentRef,
        actor: &Actor,
    ) -> Result<ReactivationOutcome, CoreError> {
        let graph = self.load_graph(document_ref.kind).await?;
        let grants = self.permission_repo.find_by_user(actor.id()).await?;
        if let Err(e) = authorize_reactivation(
            actor,
            graph
                .as_ref()
                .and_then(|g| g.definition().reactivation_permission()),
            &grants,
        ) {
            log_denied(document_ref, actor, "reactivate", &e);
            return Err(e.into());
        }
        let now = self.clock.now();

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;

        let mut document = self
            .document_repo
            .find_for_update(&mut tx, document_ref)
            .await
            .or_not_found("文書")?;
        let mut status = lifecycle::reactivate(&mut document, actor.id(), now)?;

        let workflow = match &graph {
            Some(graph) => {
                match self
                    .locked_workflow(&mut tx, graph, document_ref, Some(actor.id()))
                    .await?
                {
                    Some(workflow) => {
                        Self::ensure_same_definition(graph, &workflow)?;
                        let target = StateName::new(status.state_name())
                            .ok()
                            .and_then(|name| graph.state(&name))
                            .or_else(|| graph.initial_state())
                            .ok_or_else(|| {
                                ActionError::ConfigurationMissing(format!(
                                    "{} のワークフローに再開先の状態がありません",
                                    document_ref.kind
                                ))
                            })?;
                        status = DocStatus::from_state_name(target.name())
                            .map_err(|e| ActionError::ConfigurationMissing(e.to_string()))?;
                        document.header_mut().doc_status = status;

                        let expected_version = workflow.version();
                        let workflow = workflow.transitioned(target, now)?;
                        self.workflow_repo
                            .update_with_version_check(&mut tx, &workflow, expected_version)
                            .await
                            .or_conflict("文書ワークフロー")?;
                        Some(workflow)
                    }
                    None => None,
                }
            }
            None => None,
        };

        self.document_repo.update(&mut tx, &document).await?;
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::WORKFLOW_REACTIVATED,
            event.entity_type = event::entity_type::DOCUMENT,
            event.entity_id = %document_ref,
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            status = %status,
            "文書を再開しました"
        );

        Ok(ReactivationOutcome {
            document,
            workflow,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use erpflow_domain::{
        document::DocumentKind,
        lifecycle::FieldLock,
        value_objects::Money,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::usecase::workflow::test_helpers::{Mocks, admin, clerk};

    async fn run(sut: &WorkflowUseCaseImpl, doc: &DocumentRef, actor: &Actor, actions: &[&str]) {
        for action in actions {
            sut.execute_action(doc, action, actor, ActionParams::default())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_閾値未満の発注は自動承認されて承認記録が残る() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 500);
        let sut = mocks.sut();
        let actor = clerk();

        let outcome = sut
            .execute_action(&doc, "auto_approve", &actor, ActionParams::default())
            .await
            .unwrap();

        assert_eq!(outcome.workflow.current_state().as_str(), "approved");
        assert_eq!(outcome.workflow.version().as_i32(), 2);
        assert_eq!(mocks.status(&doc), DocStatus::Approved);
        let approval = outcome.approval.unwrap();
        assert_eq!(approval.status(), ApprovalStatus::Approved);
        assert_eq!(approval.approver(), Some(actor.id()));
        assert_eq!(approval.amount_at_request(), Some(Money::from_major(500)));
        assert_eq!(
            approval.comments(),
            Some(auto_approval_comment("DOC-0001").as_str())
        );
    }

    #[tokio::test]
    async fn test_閾値以上の発注に自動承認は使えない() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 5000);
        let sut = mocks.sut();

        let result = sut
            .execute_action(&doc, "auto_approve", &admin(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::InvalidTransition { .. }))
        ));
        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
    }

    #[tokio::test]
    async fn test_請求書の申請と却下で下書きに戻る() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Invoice, 1500);
        let sut = mocks.sut();
        let approver = clerk();
        mocks.grant(approver.id(), "invoice_approve");

        run(&sut, &doc, &clerk(), &["submit_approval"]).await;
        assert_eq!(mocks.status(&doc), DocStatus::PendingApproval);

        let outcome = sut
            .execute_action(&doc, "reject", &approver, ActionParams::with_comment("金額誤り"))
            .await
            .unwrap();

        assert_eq!(outcome.workflow.current_state().as_str(), "draft");
        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
        let approvals = mocks.approvals.approvals();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].status(), ApprovalStatus::Rejected);
        assert_eq!(approvals[0].comments(), Some("金額誤り"));
    }

    #[tokio::test]
    async fn test_承認で保留中の依頼が1件だけ承認済みになる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 6000);
        let sut = mocks.sut();
        let approver = clerk();
        mocks.grant(approver.id(), "approve_purchase_orders");

        run(&sut, &doc, &clerk(), &["submit_approval"]).await;
        run(&sut, &doc, &approver, &["approve"]).await;

        let approvals = mocks.approvals.approvals();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].status(), ApprovalStatus::Approved);
        assert_eq!(approvals[0].approver(), Some(approver.id()));
        assert_eq!(mocks.state(&doc), "approved");

        let again = sut
            .execute_action(&doc, "approve", &approver, ActionParams::default())
            .await;
        assert!(matches!(
            again,
            Err(CoreError::Action(ActionError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_承認権限がなければ拒否され何も変わらない() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 6000);
        let sut = mocks.sut();
        run(&sut, &doc, &clerk(), &["submit_approval"]).await;

        let result = sut
            .execute_action(&doc, "approve", &clerk(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::PermissionDenied { .. }))
        ));
        assert_eq!(mocks.state(&doc), "pending_approval");
        assert!(mocks.approvals.approvals()[0].is_pending());
    }

    #[tokio::test]
    async fn test_スーパーユーザーは権限なしで承認できる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 6000);
        let sut = mocks.sut();
        run(&sut, &doc, &clerk(), &["submit_approval"]).await;

        run(&sut, &doc, &admin(), &["approve"]).await;

        assert_eq!(mocks.status(&doc), DocStatus::Approved);
    }

    #[rstest]
    #[case(7000, false)]
    #[case(8000, true)]
    #[tokio::test]
    async fn test_承認上限は文書金額と比較される(#[case] limit: u32, #[case] allowed: bool) {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 8000);
        let sut = mocks.sut();
        let approver = clerk();
        mocks.grant_with_limit(approver.id(), "approve_purchase_orders", limit);
        run(&sut, &doc, &clerk(), &["submit_approval"]).await;

        let result = sut
            .execute_action(&doc, "approve", &approver, ActionParams::default())
            .await;

        assert_eq!(result.is_ok(), allowed);
    }

    #[tokio::test]
    async fn test_差し戻しで保留中の依頼は取り下げになる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::SalesOrder, 2000);
        let sut = mocks.sut();
        let requester = clerk();

        run(&sut, &doc, &requester, &["submit_approval", "return_to_draft"]).await;

        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
        let approvals = mocks.approvals.approvals();
        assert_eq!(approvals[0].status(), ApprovalStatus::Withdrawn);
    }

    #[tokio::test]
    async fn test_締め済みの発注に承認は不正な遷移() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();
        run(
            &sut,
            &doc,
            &clerk(),
            &["auto_approve", "start", "complete", "close"],
        )
        .await;
        assert_eq!(mocks.status(&doc), DocStatus::Closed);

        let result = sut
            .execute_action(&doc, "approve", &admin(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::InvalidTransition { .. }))
        ));
        assert_eq!(mocks.status(&doc), DocStatus::Closed);
    }

    #[rstest]
    #[case("teleport")]
    #[case("")]
    #[tokio::test]
    async fn test_存在しないアクションはunknown_action(#[case] action: &str) {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        let sut = mocks.sut();

        let result = sut
            .execute_action(&doc, action, &admin(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::UnknownAction(_)))
        ));
    }

    #[tokio::test]
    async fn test_定義がなければconfiguration_missing() {
        let mocks = Mocks::default();
        let doc = mocks.add_document(DocumentKind::Invoice, 10);
        let sut = mocks.sut();

        let result = sut
            .execute_action(&doc, "send", &admin(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::ConfigurationMissing(_)))
        ));
    }

    #[tokio::test]
    async fn test_出荷は金額によらず承認なしで配送まで進む() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Shipment, 1_000_000);
        let sut = mocks.sut();

        run(&sut, &doc, &clerk(), &["prepare", "ship", "deliver"]).await;

        let Document::Shipment(shipment) = mocks.document(&doc) else {
            panic!("出荷を期待");
        };
        assert_eq!(shipment.header.doc_status, DocStatus::Delivered);
        assert!(!shipment.is_in_transit);
        assert!(shipment.date_received.is_some());
        assert!(mocks.approvals.approvals().is_empty());
    }

    #[tokio::test]
    async fn test_一部入金で残高が減り全額入金で完済になる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Invoice, 800);
        let sut = mocks.sut();
        let actor = clerk();
        run(&sut, &doc, &actor, &["auto_approve", "send"]).await;

        sut.execute_action(
            &doc,
            "partial_payment",
            &actor,
            ActionParams::with_amount(Money::from_major(300)),
        )
        .await
        .unwrap();

        let Document::Invoice(invoice) = mocks.document(&doc) else {
            panic!("請求書を期待");
        };
        assert_eq!(invoice.open_amount, Money::from_major(500));
        assert_eq!(invoice.paid_amount, Money::from_major(300));

        run(&sut, &doc, &actor, &["pay"]).await;
        let Document::Invoice(invoice) = mocks.document(&doc) else {
            panic!("請求書を期待");
        };
        assert!(invoice.is_paid);
        assert_eq!(invoice.open_amount, Money::zero());
        assert_eq!(invoice.header.doc_status, DocStatus::Paid);
    }

    #[tokio::test]
    async fn test_入金額がなければ一部入金は入力エラーで状態は変わらない() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Invoice, 800);
        let sut = mocks.sut();
        run(&sut, &doc, &clerk(), &["auto_approve", "send"]).await;

        let result = sut
            .execute_action(&doc, "partial_payment", &clerk(), ActionParams::default())
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::InvalidInput(_)))
        ));
        assert_eq!(mocks.state(&doc), "sent");
        assert_eq!(mocks.status(&doc), DocStatus::Sent);
    }

    #[tokio::test]
    async fn test_並行更新で競合した場合はconflict() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();
        sut.ensure_workflow(&mocks.document(&doc), None).await.unwrap();
        mocks.workflows.conflict_on_next_update();

        let result = sut
            .execute_action(&doc, "auto_approve", &clerk(), ActionParams::default())
            .await;

        assert!(matches!(result, Err(CoreError::Conflict(_))));
        assert_eq!(mocks.state(&doc), "draft");
    }

    #[tokio::test]
    async fn test_状態とステータスは常に一致する() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::SalesOrder, 50);
        let sut = mocks.sut();
        let actor = admin();

        for action in ["auto_approve", "start", "complete", "close", "reopen", "reset_to_draft"] {
            let outcome = sut
                .execute_action(&doc, action, &actor, ActionParams::default())
                .await
                .unwrap();
            assert_eq!(
                outcome.document.doc_status().state_name(),
                outcome.workflow.current_state().as_str()
            );
        }
        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
    }

    // === reactivate ===

    #[tokio::test]
    async fn test_完了した発注を再開すると作業中に戻る() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();
        let manager = clerk();
        mocks.grant(manager.id(), "reactivate_documents");
        run(&sut, &doc, &clerk(), &["auto_approve", "start", "complete"]).await;

        let outcome = sut.reactivate(&doc, &manager).await.unwrap();

        assert_eq!(outcome.status, DocStatus::InProgress);
        assert_eq!(outcome.workflow.unwrap().current_state().as_str(), "in_progress");
        let Document::PurchaseOrder(order) = mocks.document(&doc) else {
            panic!("発注を期待");
        };
        assert!(!order.is_received);
        assert!(order.date_received.is_none());
        assert_eq!(order.header.updated_by.as_ref(), Some(manager.id()));
    }

    #[tokio::test]
    async fn test_再開した発注は再び完了できる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();
        let actor = admin();
        run(&sut, &doc, &actor, &["auto_approve", "start", "complete"]).await;

        sut.reactivate(&doc, &actor).await.unwrap();
        run(&sut, &doc, &actor, &["complete"]).await;

        let Document::PurchaseOrder(order) = mocks.document(&doc) else {
            panic!("発注を期待");
        };
        assert!(order.is_received);
        assert_eq!(order.header.doc_status, DocStatus::Complete);
    }

    #[tokio::test]
    async fn test_完済の請求書を再開すると送付済みに戻り残高が復元される() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Invoice, 800);
        let sut = mocks.sut();
        let actor = admin();
        run(&sut, &doc, &actor, &["auto_approve", "send", "pay"]).await;

        let outcome = sut.reactivate(&doc, &actor).await.unwrap();

        assert_eq!(outcome.status, DocStatus::Sent);
        assert_eq!(mocks.state(&doc), "sent");
        let Document::Invoice(invoice) = mocks.document(&doc) else {
            panic!("請求書を期待");
        };
        assert!(!invoice.is_paid);
        assert_eq!(invoice.open_amount, Money::from_major(800));
        assert_eq!(invoice.paid_amount, Money::zero());
    }

    #[tokio::test]
    async fn test_作業中の状態がない出荷は初期状態に戻る() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        let sut = mocks.sut();
        let actor = admin();
        run(&sut, &doc, &actor, &["prepare", "ship", "deliver", "complete"]).await;

        let outcome = sut.reactivate(&doc, &actor).await.unwrap();

        assert_eq!(outcome.status, DocStatus::Drafted);
        assert_eq!(mocks.state(&doc), "draft");
        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
    }

    #[tokio::test]
    async fn test_再開権限がなければ状態を確認する前に拒否する() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();

        let result = sut.reactivate(&doc, &clerk()).await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::PermissionDenied { .. }))
        ));
    }

    #[tokio::test]
    async fn test_下書きの文書は再開できない() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100);
        let sut = mocks.sut();

        let result = sut.reactivate(&doc, &admin()).await;

        assert!(matches!(
            result,
            Err(CoreError::Action(ActionError::PreconditionFailed { .. }))
        ));
        assert_eq!(mocks.status(&doc), DocStatus::Drafted);
    }

    #[tokio::test]
    async fn test_定義がない文書の再開はスーパーユーザーのみ() {
        let mocks = Mocks::default();
        let doc = mocks.add_document(DocumentKind::SalesOrder, 10);
        let sut = mocks.sut();

        let denied = sut.reactivate(&doc, &clerk()).await;

        assert!(matches!(
            denied,
            Err(CoreError::Action(ActionError::PermissionDenied { .. }))
        ));
    }

    #[tokio::test]
    async fn test_再開後の状態は項目ロックが備考のみ() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::SalesOrder, 10);
        let sut = mocks.sut();
        let actor = admin();
        run(&sut, &doc, &actor, &["auto_approve", "start", "complete", "close"]).await;

        sut.reactivate(&doc, &actor).await.unwrap();

        let view = sut.workflow_status(&doc).await.unwrap();
        assert_eq!(view.field_lock, FieldLock::NotesOnly);
    }
}

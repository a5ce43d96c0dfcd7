//! 実行可能アクションとワークフロー状況の参照

use erpflow_domain::{
    document::{Document, DocumentRef, WorkflowDocument},
    lifecycle::{self, FieldLock},
    permission::authorize,
    user::Actor,
    value_objects::{ActionName, ButtonColor, DisplayLabel, StateName},
    workflow::{ApprovalEffect, DocumentWorkflow, WorkflowApproval, WorkflowState},
};

use super::WorkflowUseCaseImpl;
use crate::{error::CoreError, usecase::helpers::FindResultExt};

/// 現在状態から実行できるアクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableAction {
    pub action:       ActionName,
    pub label:        DisplayLabel,
    pub button_color: ButtonColor,
    pub to_state:     StateName,
    /// 操作者がこのアクションの権限を持つか
    pub permitted:    bool,
}

/// 文書のワークフロー状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStatusView {
    pub document:       Document,
    pub workflow:       Option<DocumentWorkflow>,
    pub current_state:  Option<WorkflowState>,
    pub field_lock:     FieldLock,
    pub needs_approval: bool,
    /// 承認履歴（依頼日時の昇順）
    pub approvals:      Vec<WorkflowApproval>,
}

impl WorkflowUseCaseImpl {
    /// 文書の現在状態から提示するアクションの一覧
    ///
    /// 承認要否により申請と自動承認のどちらか一方だけを含め、遷移先の並び順で返す。
    /// 権限のないアクションも `permitted: false` として含める。
    /// ワークフローがない文書は空。
    #[tracing::instrument(skip_all, fields(document = %document_ref))]
    pub async fn available_actions(
        &self,
        document_ref: &DocumentRef,
        actor: &Actor,
    ) -> Result<Vec<AvailableAction>, CoreError> {
        let document = self
            .document_repo
            .find(document_ref)
            .await
            .or_not_found("文書")?;
        let Some(graph) = self.load_graph(document_ref.kind).await? else {
            return Ok(Vec::new());
        };
        let Some(workflow) = self
            .resolve_workflow(&document, &graph, Some(actor.id()))
            .await?
        else {
            return Ok(Vec::new());
        };

        let grants = self.permission_repo.find_by_user(actor.id()).await?;
        let definition = graph.definition();
        let approval_needed = lifecycle::needs_approval(Some(definition), &document);

        let actions = graph
            .offered_transitions(workflow.current_state(), approval_needed)
            .into_iter()
            .map(|t| {
                let limit_amount =
                    (t.approval_effect() == ApprovalEffect::Approve).then(|| document.total_amount());
                AvailableAction {
                    action:       t.action().clone(),
                    label:        t.name().clone(),
                    button_color: t.button_color(),
                    to_state:     t.to_state().clone(),
                    permitted:    authorize(
                        actor,
                        t.effective_permission(definition),
                        &grants,
                        limit_amount,
                    )
                    .is_ok(),
                }
            })
            .collect();
        Ok(actions)
    }

    /// 文書のワークフロー状況（現在状態・項目ロック・承認履歴）
    #[tracing::instrument(skip_all, fields(document = %document_ref))]
    pub async fn workflow_status(
        &self,
        document_ref: &DocumentRef,
    ) -> Result<WorkflowStatusView, CoreError> {
        let document = self
            .document_repo
            .find(document_ref)
            .await
            .or_not_found("文書")?;
        let graph = self.load_graph(document_ref.kind).await?;

        let (workflow, current_state) = match &graph {
            Some(graph) => {
                let workflow = self.resolve_workflow(&document, graph, None).await?;
                let state = workflow
                    .as_ref()
                    .and_then(|w| graph.state(w.current_state()).cloned());
                (workflow, state)
            }
            None => (None, None),
        };

        let approvals = match &workflow {
            Some(w) => self.approval_repo.find_by_workflow(w.id()).await?,
            None => Vec::new(),
        };

        Ok(WorkflowStatusView {
            field_lock: lifecycle::field_lock(current_state.as_ref()),
            needs_approval: lifecycle::needs_approval(
                graph.as_ref().map(|g| g.definition()),
                &document,
            ),
            document,
            workflow,
            current_state,
            approvals,
        })
    }
}

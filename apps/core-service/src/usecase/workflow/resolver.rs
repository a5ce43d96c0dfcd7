//! 文書ワークフローの解決
//!
//! ワークフロー行は文書ごとに 1 つだけ存在し、最初にアクセスされたときに
//! 定義の初期状態で作成される。同時アクセスでも行が重複しないよう、
//! 挿入は `insert_if_absent` で行い、結果は常に DB から読み直す。

use erpflow_domain::{
    action::ActionError,
    document::{Document, DocumentKind, DocumentRef, WorkflowDocument},
    lifecycle,
    user::{Actor, UserId},
    workflow::{
        DocumentWorkflow,
        DocumentWorkflowId,
        NewDocumentWorkflow,
        WorkflowGraph,
        WorkflowState,
    },
};
use erpflow_infra::TxContext;
use erpflow_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::WorkflowUseCaseImpl;
use crate::{
    error::CoreError,
    usecase::helpers::{FindResultExt, begin_tx, commit_tx},
};

impl WorkflowUseCaseImpl {
    /// 文書種別のワークフローを読み込む
    pub(crate) async fn load_graph(
        &self,
        kind: DocumentKind,
    ) -> Result<Option<WorkflowGraph>, CoreError> {
        let graph = self.definition_repo.find_graph_by_kind(kind).await?;
        if graph.is_none() {
            tracing::debug!(
                error.category = log_error::category::CONFIGURATION,
                error.kind = log_error::kind::WORKFLOW_MISSING,
                document_kind = %kind,
                "ワークフロー定義がありません"
            );
        }
        Ok(graph)
    }

    /// 操作者を解決する
    ///
    /// スーパーユーザーかどうかはユーザーテーブルで判定する。
    /// 登録のないユーザーは一般ユーザーとして扱う。
    pub async fn resolve_actor(&self, user_id: UserId) -> Result<Actor, CoreError> {
        let actor = self.user_repo.find_actor(&user_id).await?;
        Ok(actor.unwrap_or_else(|| Actor::user(user_id)))
    }

    /// 文書のワークフローを取得し、なければ作成する
    ///
    /// 未保存の文書、ワークフロー定義のない文書種別、初期状態が未設定の定義では `None`。
    /// 何度呼んでも同じ文書に対して行は 1 つしか作られない。
    #[tracing::instrument(skip_all)]
    pub async fn ensure_workflow(
        &self,
        document: &Document,
        created_by: Option<&UserId>,
    ) -> Result<Option<DocumentWorkflow>, CoreError> {
        let Some(graph) = self.load_graph(document.kind()).await? else {
            return Ok(None);
        };
        self.resolve_workflow(document, &graph, created_by).await
    }

    /// 読み込み済みのワークフローで文書のワークフローを解決する
    pub(super) async fn resolve_workflow(
        &self,
        document: &Document,
        graph: &WorkflowGraph,
        created_by: Option<&UserId>,
    ) -> Result<Option<DocumentWorkflow>, CoreError> {
        let Some(document_ref) = document.document_ref() else {
            return Ok(None);
        };
        if let Some(workflow) = self.workflow_repo.find_by_document(&document_ref).await? {
            return Ok(Some(workflow));
        }

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;
        let workflow = self
            .attach_workflow(&mut tx, graph, &document_ref, created_by)
            .await?;
        commit_tx(tx).await?;
        Ok(workflow)
    }

    /// トランザクション内で文書にワークフローを結び付ける
    ///
    /// 既に行があればそれを行ロック付きで返す。
    pub(crate) async fn attach_workflow(
        &self,
        tx: &mut TxContext,
        graph: &WorkflowGraph,
        document_ref: &DocumentRef,
        created_by: Option<&UserId>,
    ) -> Result<Option<DocumentWorkflow>, CoreError> {
        let Some(initial_state) = graph.initial_state() else {
            tracing::warn!(
                error.category = log_error::category::CONFIGURATION,
                error.kind = log_error::kind::WORKFLOW_MISSING,
                document = %document_ref,
                initial_state = %graph.definition().initial_state(),
                "ワークフローの初期状態が見つかりません"
            );
            return Ok(None);
        };

        let candidate = DocumentWorkflow::new(NewDocumentWorkflow {
            id: DocumentWorkflowId::new(),
            document: document_ref.clone(),
            definition_id: graph.definition().id().clone(),
            initial_state,
            created_by: created_by.cloned(),
            now: self.clock.now(),
        })?;
        let created = self.workflow_repo.insert_if_absent(tx, &candidate).await?;
        let workflow = self
            .workflow_repo
            .find_by_document_for_update(tx, document_ref)
            .await
            .or_not_found("文書ワークフロー")?;

        if created {
            log_business_event!(
                event.category = event::category::WORKFLOW,
                event.action = event::action::WORKFLOW_CREATED,
                event.entity_type = event::entity_type::DOCUMENT_WORKFLOW,
                event.entity_id = %workflow.id(),
                document = %document_ref,
                state = %workflow.current_state(),
                event.result = event::result::SUCCESS,
                "文書ワークフローを作成しました"
            );
        }
        Ok(Some(workflow))
    }

    /// ワークフロー行を行ロック付きで取得し、なければ作成する
    pub(crate) async fn locked_workflow(
        &self,
        tx: &mut TxContext,
        graph: &WorkflowGraph,
        document_ref: &DocumentRef,
        created_by: Option<&UserId>,
    ) -> Result<Option<DocumentWorkflow>, CoreError> {
        match self
            .workflow_repo
            .find_by_document_for_update(tx, document_ref)
            .await?
        {
            Some(workflow) => Ok(Some(workflow)),
            None => self.attach_workflow(tx, graph, document_ref, created_by).await,
        }
    }

    /// 文書が承認を必要とするか
    ///
    /// ワークフローを持てない文書（定義がない、初期状態が未設定）は常に `false`。
    pub async fn needs_approval(&self, document_ref: &DocumentRef) -> Result<bool, CoreError> {
        let document = self
            .document_repo
            .find(document_ref)
            .await
            .or_not_found("文書")?;
        let Some(graph) = self.load_graph(document_ref.kind).await? else {
            return Ok(false);
        };
        if self.resolve_workflow(&document, &graph, None).await?.is_none() {
            return Ok(false);
        }
        Ok(lifecycle::needs_approval(Some(graph.definition()), &document))
    }

    /// 文書の現在のワークフロー状態
    pub async fn current_state(&self, document: &Document) -> Result<Option<WorkflowState>, CoreError> {
        let Some(graph) = self.load_graph(document.kind()).await? else {
            return Ok(None);
        };
        let workflow = self.resolve_workflow(document, &graph, None).await?;
        Ok(workflow.and_then(|w| graph.state(w.current_state()).cloned()))
    }

    /// ワークフローが読み込んだ定義に属しているか確認する
    pub(super) fn ensure_same_definition(
        graph: &WorkflowGraph,
        workflow: &DocumentWorkflow,
    ) -> Result<(), ActionError> {
        if workflow.definition_id() != graph.definition().id() {
            return Err(ActionError::ConfigurationMissing(format!(
                "文書 {} のワークフローが現在の定義と一致しません",
                workflow.document()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use erpflow_domain::{
        document::{DocumentHeader, DocumentKind},
        value_objects::Money,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::usecase::{
        setup::WorkflowBlueprint,
        workflow::test_helpers::{Mocks, now},
    };

    #[tokio::test]
    async fn test_初回アクセスで初期状態のワークフローが作られる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 500);
        let sut = mocks.sut();

        let workflow = sut
            .ensure_workflow(&mocks.document(&doc), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(workflow.document(), &doc);
        assert_eq!(workflow.current_state().as_str(), "draft");
        assert_eq!(workflow.version().as_i32(), 1);
    }

    #[tokio::test]
    async fn test_繰り返し解決しても行は1つ() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Invoice, 100);
        let sut = mocks.sut();
        let document = mocks.document(&doc);

        let first = sut.ensure_workflow(&document, None).await.unwrap().unwrap();
        let second = sut.ensure_workflow(&document, None).await.unwrap().unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(mocks.workflows.workflows().len(), 1);
    }

    #[tokio::test]
    async fn test_未保存の文書にはワークフローを作らない() {
        let mocks = Mocks::seeded();
        let sut = mocks.sut();
        let document = Document::draft(
            DocumentKind::SalesOrder,
            DocumentHeader::draft("SO-000001", Money::from_major(10), now()),
        );

        let workflow = sut.ensure_workflow(&document, None).await.unwrap();

        assert!(workflow.is_none());
        assert!(mocks.workflows.workflows().is_empty());
    }

    #[tokio::test]
    async fn test_定義のない文書種別はワークフローなし() {
        let mocks = Mocks::default();
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        let sut = mocks.sut();

        let workflow = sut.ensure_workflow(&mocks.document(&doc), None).await.unwrap();

        assert!(workflow.is_none());
    }

    #[rstest]
    #[case(DocumentKind::PurchaseOrder, 4999, false)]
    #[case(DocumentKind::PurchaseOrder, 5000, true)]
    #[case(DocumentKind::SalesOrder, 999, false)]
    #[case(DocumentKind::SalesOrder, 1000, true)]
    #[case(DocumentKind::Invoice, 1500, true)]
    #[case(DocumentKind::Shipment, 1_000_000, false)]
    #[tokio::test]
    async fn test_承認要否は閾値以上の場合のみ(
        #[case] kind: DocumentKind,
        #[case] total: u32,
        #[case] expected: bool,
    ) {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(kind, total);
        let sut = mocks.sut();

        assert_eq!(sut.needs_approval(&doc).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_定義がなければ承認不要() {
        let mocks = Mocks::default();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100_000);
        let sut = mocks.sut();

        assert!(!sut.needs_approval(&doc).await.unwrap());
    }

    #[tokio::test]
    async fn test_初期状態のない定義では閾値を超えても承認不要() {
        let mocks = Mocks::default();
        let mut blueprint = WorkflowBlueprint::preset(DocumentKind::PurchaseOrder);
        blueprint.initial_state = "missing";
        mocks.definitions.add_graph(&blueprint.build(now()).unwrap());
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 100_000);
        let sut = mocks.sut();

        assert!(!sut.needs_approval(&doc).await.unwrap());
        assert!(mocks.workflows.workflows().is_empty());
    }

    #[tokio::test]
    async fn test_承認要否の判定でワークフローが作られる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 5000);
        let sut = mocks.sut();

        assert!(sut.needs_approval(&doc).await.unwrap());
        assert_eq!(mocks.state(&doc), "draft");
    }

    #[tokio::test]
    async fn test_現在状態を取得できる() {
        let mocks = Mocks::seeded();
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        let sut = mocks.sut();

        let state = sut.current_state(&mocks.document(&doc)).await.unwrap().unwrap();

        assert_eq!(state.name().as_str(), "draft");
        assert_eq!(state.display_name().as_str(), "Draft");
    }

    #[tokio::test]
    async fn test_操作者のスーパーユーザー判定はユーザーテーブルに従う() {
        let mocks = Mocks::seeded();
        let admin_id = UserId::new();
        mocks.users.add_user(Actor::superuser(admin_id.clone()));
        let sut = mocks.sut();

        let actor = sut.resolve_actor(admin_id.clone()).await.unwrap();

        assert_eq!(actor, Actor::superuser(admin_id));
    }

    #[tokio::test]
    async fn test_未登録の操作者は一般ユーザーとして扱われる() {
        let mocks = Mocks::seeded();
        let user_id = UserId::new();
        let sut = mocks.sut();

        let actor = sut.resolve_actor(user_id.clone()).await.unwrap();

        assert_eq!(actor, Actor::user(user_id));
        assert!(!actor.is_superuser());
    }
}

//! # 文書ユースケース
//!
//! 文書の登録（採番とワークフローの作成）と、項目ロックに従った補足項目の更新。

use std::sync::Arc;

use erpflow_domain::{
    clock::Clock,
    document::{Document, DocumentHeader, DocumentId, DocumentKind, DocumentRef, WorkflowDocument},
    lifecycle::{DocumentField, ensure_field_editable},
    user::{Actor, UserId},
    value_objects::Money,
    workflow::DocumentWorkflow,
};
use erpflow_infra::{
    InfraErrorKind,
    TransactionManager,
    repository::{DocumentRepository, NumberSequenceRepository},
};
use erpflow_shared::{event_log::event, log_business_event};

use crate::{
    error::CoreError,
    usecase::{
        helpers::{FindResultExt, begin_tx, commit_tx},
        workflow::WorkflowUseCaseImpl,
    },
};

/// 文書登録の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocumentInput {
    pub kind:        DocumentKind,
    pub grand_total: Money,
    /// 空または未指定の場合は採番する
    pub document_no: Option<String>,
    pub description: Option<String>,
}

/// 補足項目の更新入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotesInput {
    pub document:    DocumentRef,
    pub description: Option<String>,
    /// 出荷のみ
    pub tracking_no: Option<String>,
}

/// 登録結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDocument {
    pub document: Document,
    /// ワークフロー定義がない文書種別は `None`
    pub workflow: Option<DocumentWorkflow>,
}

pub struct DocumentUseCaseImpl {
    document_repo: Arc<dyn DocumentRepository>,
    sequence_repo: Arc<dyn NumberSequenceRepository>,
    workflow: Arc<WorkflowUseCaseImpl>,
    clock: Arc<dyn Clock>,
    tx_manager: Arc<dyn TransactionManager>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DocumentUseCaseImpl {
    pub fn new(
        document_repo: Arc<dyn DocumentRepository>,
        sequence_repo: Arc<dyn NumberSequenceRepository>,
        workflow: Arc<WorkflowUseCaseImpl>,
        clock: Arc<dyn Clock>,
        tx_manager: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            document_repo,
            sequence_repo,
            workflow,
            clock,
            tx_manager,
        }
    }

    /// 操作者を解決する
    pub async fn resolve_actor(&self, user_id: UserId) -> Result<Actor, CoreError> {
        self.workflow.resolve_actor(user_id).await
    }

    /// 文書を下書きとして登録し、ワークフローを初期状態で作成する
    ///
    /// 文書番号が未指定なら種別ごとの連番を払い出す。払い出しは登録とは別に
    /// 確定するため、登録が失敗すると番号は欠番になる。
    ///
    /// # Errors
    ///
    /// - `CoreError::Conflict`: 文書番号が既に使われている
    #[tracing::instrument(skip_all, fields(kind = %input.kind))]
    pub async fn register_document(
        &self,
        input: NewDocumentInput,
        actor: &Actor,
    ) -> Result<RegisteredDocument, CoreError> {
        let now = self.clock.now();
        let document_no = match non_blank(input.document_no) {
            Some(no) => no,
            None => {
                self.sequence_repo
                    .next_document_no(input.kind, now.date_naive())
                    .await?
            }
        };
        let graph = self.workflow.load_graph(input.kind).await?;

        let id = DocumentId::new();
        let mut header = DocumentHeader::draft(document_no, input.grand_total, now);
        header.id = Some(id.clone());
        header.description = non_blank(input.description);
        header.touch(actor.id(), now);
        let document = Document::draft(input.kind, header);
        let document_ref = DocumentRef::new(input.kind, id);

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;
        self.document_repo
            .insert(&mut tx, &document)
            .await
            .map_err(|e| match e.kind() {
                InfraErrorKind::Conflict { .. } => CoreError::Conflict(format!(
                    "文書番号 {} は既に使われています",
                    document.header().document_no
                )),
                _ => CoreError::Database(e),
            })?;
        let workflow = match &graph {
            Some(graph) => {
                self.workflow
                    .attach_workflow(&mut tx, graph, &document_ref, Some(actor.id()))
                    .await?
            }
            None => None,
        };
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::DOCUMENT,
            event.action = event::action::DOCUMENT_REGISTERED,
            event.entity_type = event::entity_type::DOCUMENT,
            event.entity_id = %document_ref,
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            document_no = %document.header().document_no,
            "文書を登録しました"
        );

        Ok(RegisteredDocument { document, workflow })
    }

    /// 備考・追跡番号を更新する
    ///
    /// 文書行とワークフロー行をロックした上で、その時点の状態の項目ロックに従う。
    /// 追跡番号は出荷のみ。
    ///
    /// # Errors
    ///
    /// - `CoreError::BadRequest`: 更新項目がない、または出荷以外に追跡番号を指定
    /// - `CoreError::Forbidden`: 項目がロックされている
    #[tracing::instrument(skip_all, fields(document = %input.document))]
    pub async fn update_notes(
        &self,
        input: UpdateNotesInput,
        actor: &Actor,
    ) -> Result<Document, CoreError> {
        if input.description.is_none() && input.tracking_no.is_none() {
            return Err(CoreError::BadRequest("更新する項目がありません".to_string()));
        }
        let kind = input.document.kind;
        if input.tracking_no.is_some() && kind != DocumentKind::Shipment {
            return Err(CoreError::BadRequest(
                "追跡番号は出荷にのみ設定できます".to_string(),
            ));
        }

        let graph = self.workflow.load_graph(kind).await?;
        let now = self.clock.now();

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;
        let mut document = self
            .document_repo
            .find_for_update(&mut tx, &input.document)
            .await
            .or_not_found("文書")?;
        let state = match &graph {
            Some(graph) => self
                .workflow
                .locked_workflow(&mut tx, graph, &input.document, Some(actor.id()))
                .await?
                .and_then(|w| graph.state(w.current_state()).cloned()),
            None => None,
        };
        if input.description.is_some() {
            ensure_field_editable(kind, state.as_ref(), DocumentField::Description)?;
        }
        if input.tracking_no.is_some() {
            ensure_field_editable(kind, state.as_ref(), DocumentField::TrackingNo)?;
        }

        if let Some(description) = input.description {
            document.header_mut().description = non_blank(Some(description));
        }
        if let (Some(tracking_no), Document::Shipment(shipment)) = (input.tracking_no, &mut document) {
            shipment.tracking_no = non_blank(Some(tracking_no));
        }
        document.header_mut().touch(actor.id(), now);

        self.document_repo.update(&mut tx, &document).await?;
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::DOCUMENT,
            event.action = event::action::DOCUMENT_UPDATED,
            event.entity_type = event::entity_type::DOCUMENT,
            event.entity_id = %input.document,
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            "文書の補足項目を更新しました"
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use erpflow_domain::{action::ActionParams, clock::FixedClock, document::DocStatus};
    use erpflow_infra::mock::{MockNumberSequenceRepository, MockTransactionManager};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::workflow::test_helpers::{Mocks, admin, clerk, now};

    fn build_sut(mocks: &Mocks) -> (DocumentUseCaseImpl, Arc<WorkflowUseCaseImpl>) {
        let workflow = Arc::new(mocks.sut());
        let sut = DocumentUseCaseImpl::new(
            Arc::new(mocks.documents.clone()),
            Arc::new(MockNumberSequenceRepository::new()),
            workflow.clone(),
            Arc::new(FixedClock::new(now())),
            Arc::new(MockTransactionManager),
        );
        (sut, workflow)
    }

    fn input(kind: DocumentKind, total: u32) -> NewDocumentInput {
        NewDocumentInput {
            kind,
            grand_total: Money::from_major(total),
            document_no: None,
            description: None,
        }
    }

    fn notes(document: &DocumentRef, description: Option<&str>, tracking_no: Option<&str>) -> UpdateNotesInput {
        UpdateNotesInput {
            document:    document.clone(),
            description: description.map(str::to_string),
            tracking_no: tracking_no.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_登録で採番され下書きのワークフローが作られる() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let actor = clerk();

        let first = sut
            .register_document(input(DocumentKind::PurchaseOrder, 100), &actor)
            .await
            .unwrap();
        let second = sut
            .register_document(input(DocumentKind::PurchaseOrder, 100), &actor)
            .await
            .unwrap();

        assert_eq!(first.document.header().document_no, "PO-000001");
        assert_eq!(second.document.header().document_no, "PO-000002");
        assert_eq!(first.document.doc_status(), DocStatus::Drafted);
        let workflow = first.workflow.unwrap();
        assert_eq!(workflow.current_state().as_str(), "draft");
        assert_eq!(workflow.created_by(), Some(actor.id()));
        assert_eq!(mocks.workflows.workflows().len(), 2);
    }

    #[tokio::test]
    async fn test_指定した文書番号で登録できる() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);

        let registered = sut
            .register_document(
                NewDocumentInput {
                    document_no: Some(" INV-2024-7 ".to_string()),
                    ..input(DocumentKind::Invoice, 100)
                },
                &clerk(),
            )
            .await
            .unwrap();

        assert_eq!(registered.document.header().document_no, "INV-2024-7");
    }

    #[tokio::test]
    async fn test_重複した文書番号はconflict() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let duplicate = || NewDocumentInput {
            document_no: Some("SO-1".to_string()),
            ..input(DocumentKind::SalesOrder, 100)
        };
        sut.register_document(duplicate(), &clerk()).await.unwrap();

        let result = sut.register_document(duplicate(), &clerk()).await;

        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_定義のない文書種別はワークフローなしで登録される() {
        let mocks = Mocks::default();
        let (sut, _) = build_sut(&mocks);

        let registered = sut
            .register_document(input(DocumentKind::Shipment, 10), &clerk())
            .await
            .unwrap();

        assert!(registered.workflow.is_none());
        assert!(mocks.workflows.workflows().is_empty());
    }

    #[tokio::test]
    async fn test_下書きの備考を更新できる() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::SalesOrder, 10);
        let actor = clerk();

        let document = sut
            .update_notes(notes(&doc, Some("至急"), None), &actor)
            .await
            .unwrap();

        assert_eq!(document.header().description.as_deref(), Some("至急"));
        assert_eq!(document.header().updated_by.as_ref(), Some(actor.id()));
        assert_eq!(
            mocks.document(&doc).header().description.as_deref(),
            Some("至急")
        );
    }

    #[tokio::test]
    async fn test_輸送中の出荷は追跡番号を更新できる() {
        let mocks = Mocks::seeded();
        let (sut, workflow) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        for action in ["prepare", "ship"] {
            workflow
                .execute_action(&doc, action, &admin(), ActionParams::default())
                .await
                .unwrap();
        }

        sut.update_notes(notes(&doc, None, Some("TRK-123")), &clerk())
            .await
            .unwrap();

        let Document::Shipment(shipment) = mocks.document(&doc) else {
            panic!("出荷を期待");
        };
        assert_eq!(shipment.tracking_no.as_deref(), Some("TRK-123"));
    }

    #[tokio::test]
    async fn test_配送済みの出荷は追跡番号を更新できない() {
        let mocks = Mocks::seeded();
        let (sut, workflow) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::Shipment, 10);
        for action in ["prepare", "ship", "deliver"] {
            workflow
                .execute_action(&doc, action, &admin(), ActionParams::default())
                .await
                .unwrap();
        }

        let result = sut
            .update_notes(notes(&doc, None, Some("TRK-123")), &clerk())
            .await;

        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_締め済みの文書は備考も更新できない() {
        let mocks = Mocks::seeded();
        let (sut, workflow) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 10);
        for action in ["auto_approve", "start", "complete", "close"] {
            workflow
                .execute_action(&doc, action, &admin(), ActionParams::default())
                .await
                .unwrap();
        }

        let result = sut.update_notes(notes(&doc, Some("追記"), None), &clerk()).await;

        assert!(matches!(result, Err(CoreError::Forbidden(_))));
        assert!(mocks.document(&doc).header().description.is_none());
    }

    #[tokio::test]
    async fn test_項目ロックは行ロックした最新の状態で判定される() {
        let mocks = Mocks::seeded();
        let (sut, workflow) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::PurchaseOrder, 10);
        for action in ["auto_approve", "start", "complete"] {
            workflow
                .execute_action(&doc, action, &admin(), ActionParams::default())
                .await
                .unwrap();
        }
        let completed = mocks.workflows.workflows().remove(0);
        workflow
            .execute_action(&doc, "close", &admin(), ActionParams::default())
            .await
            .unwrap();
        mocks.workflows.serve_stale_unlocked_reads(completed);

        let result = sut.update_notes(notes(&doc, Some("追記"), None), &clerk()).await;

        assert!(matches!(result, Err(CoreError::Forbidden(_))));
        assert!(mocks.document(&doc).header().description.is_none());
    }

    #[tokio::test]
    async fn test_ワークフロー未作成の文書は更新時に作成される() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::Invoice, 10);

        sut.update_notes(notes(&doc, Some("備考"), None), &clerk())
            .await
            .unwrap();

        assert_eq!(mocks.state(&doc), "draft");
    }

    #[tokio::test]
    async fn test_出荷以外に追跡番号は指定できない() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::Invoice, 10);

        let result = sut
            .update_notes(notes(&doc, None, Some("TRK-1")), &clerk())
            .await;

        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_更新項目がなければbad_request() {
        let mocks = Mocks::seeded();
        let (sut, _) = build_sut(&mocks);
        let doc = mocks.add_document(DocumentKind::Invoice, 10);

        let result = sut.update_notes(notes(&doc, None, None), &clerk()).await;

        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }
}

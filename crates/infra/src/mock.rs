//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモックリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! erpflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! モックの `TxContext` はロールバックしない。書き込みは呼び出し時点で反映される。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use erpflow_domain::{
    document::{Document, DocumentKind, DocumentRef, WorkflowDocument},
    permission::PermissionGrant,
    sequence::NumberSequence,
    user::{Actor, UserId},
    value_objects::Version,
    workflow::{
        DocumentWorkflow,
        DocumentWorkflowId,
        WorkflowApproval,
        WorkflowDefinition,
        WorkflowGraph,
        WorkflowState,
        WorkflowTransition,
    },
};

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        DocumentRepository,
        DocumentWorkflowRepository,
        NumberSequenceRepository,
        Seeded,
        UserPermissionRepository,
        UserRepository,
        WorkflowApprovalRepository,
        WorkflowDefinitionRepository,
    },
};

// ===== MockTransactionManager =====

#[derive(Clone, Default)]
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}

// ===== MockWorkflowDefinitionRepository =====

#[derive(Clone, Default)]
pub struct MockWorkflowDefinitionRepository {
    definitions: Arc<Mutex<Vec<WorkflowDefinition>>>,
    states:      Arc<Mutex<Vec<WorkflowState>>>,
    transitions: Arc<Mutex<Vec<WorkflowTransition>>>,
}

impl MockWorkflowDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 定義・状態・遷移をまとめて登録する
    pub fn add_graph(&self, graph: &WorkflowGraph) {
        self.definitions
            .lock()
            .unwrap()
            .push(graph.definition().clone());
        self.states
            .lock()
            .unwrap()
            .extend(graph.states().iter().cloned());
        self.transitions
            .lock()
            .unwrap()
            .extend(graph.transitions().iter().cloned());
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.lock().unwrap().len()
    }

    pub fn state_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowDefinitionRepository for MockWorkflowDefinitionRepository {
    async fn find_graph_by_kind(
        &self,
        kind: DocumentKind,
    ) -> Result<Option<WorkflowGraph>, InfraError> {
        let Some(definition) = self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.document_kind() == kind)
            .cloned()
        else {
            return Ok(None);
        };
        let states = self
            .states
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.workflow_id() == definition.id())
            .cloned()
            .collect();
        let transitions = self
            .transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.workflow_id() == definition.id())
            .cloned()
            .collect();

        Ok(Some(WorkflowGraph::new(definition, states, transitions)?))
    }

    async fn get_or_create_definition(
        &self,
        _tx: &mut TxContext,
        definition: &WorkflowDefinition,
    ) -> Result<Seeded<WorkflowDefinition>, InfraError> {
        let mut definitions = self.definitions.lock().unwrap();
        if let Some(existing) = definitions
            .iter()
            .find(|d| d.document_kind() == definition.document_kind())
        {
            return Ok(Seeded::Existing(existing.clone()));
        }
        definitions.push(definition.clone());
        Ok(Seeded::Created(definition.clone()))
    }

    async fn get_or_create_state(
        &self,
        _tx: &mut TxContext,
        state: &WorkflowState,
    ) -> Result<Seeded<WorkflowState>, InfraError> {
        let mut states = self.states.lock().unwrap();
        if let Some(existing) = states
            .iter()
            .find(|s| s.workflow_id() == state.workflow_id() && s.name() == state.name())
        {
            return Ok(Seeded::Existing(existing.clone()));
        }
        states.push(state.clone());
        Ok(Seeded::Created(state.clone()))
    }

    async fn get_or_create_transition(
        &self,
        _tx: &mut TxContext,
        transition: &WorkflowTransition,
    ) -> Result<Seeded<WorkflowTransition>, InfraError> {
        let mut transitions = self.transitions.lock().unwrap();
        if let Some(existing) = transitions.iter().find(|t| {
            t.workflow_id() == transition.workflow_id()
                && t.from_state() == transition.from_state()
                && t.action() == transition.action()
        }) {
            return Ok(Seeded::Existing(existing.clone()));
        }
        transitions.push(transition.clone());
        Ok(Seeded::Created(transition.clone()))
    }
}

// ===== MockDocumentWorkflowRepository =====

#[derive(Clone, Default)]
pub struct MockDocumentWorkflowRepository {
    workflows:        Arc<Mutex<Vec<DocumentWorkflow>>>,
    conflict_on_next: Arc<AtomicBool>,
    stale_snapshot:   Arc<Mutex<Option<DocumentWorkflow>>>,
}

impl MockDocumentWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workflow(&self, workflow: DocumentWorkflow) {
        self.workflows.lock().unwrap().push(workflow);
    }

    pub fn workflows(&self) -> Vec<DocumentWorkflow> {
        self.workflows.lock().unwrap().clone()
    }

    /// 次回の `update_with_version_check` を競合させる（並行更新の再現用）
    pub fn conflict_on_next_update(&self) {
        self.conflict_on_next.store(true, Ordering::SeqCst);
    }

    /// ロックなしの読み込みに古い行を返させる（読み込み後に他の更新が確定した状況の再現用）
    ///
    /// 行ロック付きの読み込みは常に最新の行を返す。
    pub fn serve_stale_unlocked_reads(&self, snapshot: DocumentWorkflow) {
        *self.stale_snapshot.lock().unwrap() = Some(snapshot);
    }

    fn find(&self, document: &DocumentRef) -> Option<DocumentWorkflow> {
        self.workflows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.document() == document)
            .cloned()
    }
}

#[async_trait]
impl DocumentWorkflowRepository for MockDocumentWorkflowRepository {
    async fn find_by_document(
        &self,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError> {
        let stale = self.stale_snapshot.lock().unwrap().clone();
        match stale {
            Some(snapshot) if snapshot.document() == document => Ok(Some(snapshot)),
            _ => Ok(self.find(document)),
        }
    }

    async fn find_by_document_for_update(
        &self,
        _tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<DocumentWorkflow>, InfraError> {
        Ok(self.find(document))
    }

    async fn insert_if_absent(
        &self,
        _tx: &mut TxContext,
        workflow: &DocumentWorkflow,
    ) -> Result<bool, InfraError> {
        let mut workflows = self.workflows.lock().unwrap();
        if workflows.iter().any(|w| w.document() == workflow.document()) {
            return Ok(false);
        }
        workflows.push(workflow.clone());
        Ok(true)
    }

    async fn update_with_version_check(
        &self,
        _tx: &mut TxContext,
        workflow: &DocumentWorkflow,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let conflict = || InfraError::conflict("DocumentWorkflow", workflow.id().to_string());
        if self.conflict_on_next.swap(false, Ordering::SeqCst) {
            return Err(conflict());
        }
        let mut workflows = self.workflows.lock().unwrap();
        match workflows
            .iter_mut()
            .find(|w| w.id() == workflow.id() && w.version() == expected_version)
        {
            Some(stored) => {
                *stored = workflow.clone();
                Ok(())
            }
            None => Err(conflict()),
        }
    }
}

// ===== MockWorkflowApprovalRepository =====

#[derive(Clone, Default)]
pub struct MockWorkflowApprovalRepository {
    approvals: Arc<Mutex<Vec<WorkflowApproval>>>,
}

impl MockWorkflowApprovalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approvals(&self) -> Vec<WorkflowApproval> {
        self.approvals.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowApprovalRepository for MockWorkflowApprovalRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        approval: &WorkflowApproval,
    ) -> Result<(), InfraError> {
        let mut approvals = self.approvals.lock().unwrap();
        if approval.is_pending()
            && approvals.iter().any(|a| {
                a.document_workflow_id() == approval.document_workflow_id() && a.is_pending()
            })
        {
            return Err(InfraError::conflict(
                "WorkflowApproval",
                approval.document_workflow_id().to_string(),
            ));
        }
        approvals.push(approval.clone());
        Ok(())
    }

    async fn find_pending_for_update(
        &self,
        _tx: &mut TxContext,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Option<WorkflowApproval>, InfraError> {
        Ok(self
            .approvals
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.document_workflow_id() == document_workflow_id && a.is_pending())
            .cloned())
    }

    async fn resolve(
        &self,
        _tx: &mut TxContext,
        approval: &WorkflowApproval,
    ) -> Result<(), InfraError> {
        let mut approvals = self.approvals.lock().unwrap();
        match approvals
            .iter_mut()
            .find(|a| a.id() == approval.id() && a.is_pending())
        {
            Some(stored) => {
                *stored = approval.clone();
                Ok(())
            }
            None => Err(InfraError::conflict(
                "WorkflowApproval",
                approval.id().to_string(),
            )),
        }
    }

    async fn find_by_workflow(
        &self,
        document_workflow_id: &DocumentWorkflowId,
    ) -> Result<Vec<WorkflowApproval>, InfraError> {
        let mut found: Vec<_> = self
            .approvals
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.document_workflow_id() == document_workflow_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.requested_at());
        Ok(found)
    }
}

// ===== MockDocumentRepository =====

#[derive(Clone, Default)]
pub struct MockDocumentRepository {
    documents: Arc<Mutex<Vec<Document>>>,
}

impl MockDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, document: Document) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn get(&self, document: &DocumentRef) -> Option<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.document_ref().as_ref() == Some(document))
            .cloned()
    }
}

#[async_trait]
impl DocumentRepository for MockDocumentRepository {
    async fn find(&self, document: &DocumentRef) -> Result<Option<Document>, InfraError> {
        Ok(self.get(document))
    }

    async fn find_for_update(
        &self,
        _tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<Document>, InfraError> {
        Ok(self.get(document))
    }

    async fn insert(&self, _tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        if document.header().id.is_none() {
            return Err(InfraError::invalid_input("文書 ID が採番されていません"));
        }
        let mut documents = self.documents.lock().unwrap();
        if documents.iter().any(|d| {
            d.kind() == document.kind() && d.header().document_no == document.header().document_no
        }) {
            return Err(InfraError::conflict(
                document.kind().to_string(),
                document.header().document_no.clone(),
            ));
        }
        documents.push(document.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        let target = document.document_ref();
        let mut documents = self.documents.lock().unwrap();
        match documents
            .iter_mut()
            .find(|d| target.is_some() && d.document_ref() == target)
        {
            Some(stored) => {
                *stored = document.clone();
                Ok(())
            }
            None => Err(InfraError::unexpected("更新対象の文書が存在しません")),
        }
    }
}

// ===== MockNumberSequenceRepository =====

#[derive(Clone, Default)]
pub struct MockNumberSequenceRepository {
    sequences: Arc<Mutex<HashMap<DocumentKind, NumberSequence>>>,
}

impl MockNumberSequenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NumberSequenceRepository for MockNumberSequenceRepository {
    async fn next_document_no(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<String, InfraError> {
        let mut sequences = self.sequences.lock().unwrap();
        let current = sequences
            .remove(&kind)
            .unwrap_or_else(|| NumberSequence::default_for(kind));
        let (document_no, advanced) = current.issue(today);
        sequences.insert(kind, advanced);
        Ok(document_no)
    }
}

// ===== MockUserPermissionRepository =====

#[derive(Clone, Default)]
pub struct MockUserPermissionRepository {
    grants: Arc<Mutex<Vec<PermissionGrant>>>,
}

impl MockUserPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_grant(&self, grant: PermissionGrant) {
        self.grants.lock().unwrap().push(grant);
    }
}

#[async_trait]
impl UserPermissionRepository for MockUserPermissionRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<PermissionGrant>, InfraError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| &g.user_id == user_id)
            .cloned()
            .collect())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<Actor>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, actor: Actor) {
        self.users.lock().unwrap().push(actor);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_actor(&self, user_id: &UserId) -> Result<Option<Actor>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id() == user_id)
            .cloned())
    }
}

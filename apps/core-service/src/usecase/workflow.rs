//! # ワークフローユースケース
//!
//! 文書ワークフローの解決（遅延作成）、アクションの提示と実行、再開を扱う。
//!
//! ## モジュール構成
//!
//! - `resolver` - 文書に対応するワークフローの取得・作成、承認要否
//! - `query` - 実行可能アクションとワークフロー状況の参照
//! - `command` - アクションの実行と再開
//! - `boundary` - 業務エラーを `{ success, message }` に変換する呼び出し境界

mod boundary;
mod command;
mod query;
mod resolver;

use std::sync::Arc;

pub use boundary::ActionOutcome;
pub use command::{ReactivationOutcome, TransitionOutcome};
use erpflow_domain::clock::Clock;
use erpflow_infra::{
    TransactionManager,
    repository::{
        DocumentRepository,
        DocumentWorkflowRepository,
        UserPermissionRepository,
        UserRepository,
        WorkflowApprovalRepository,
        WorkflowDefinitionRepository,
    },
};
pub use query::{AvailableAction, WorkflowStatusView};

/// ワークフローユースケースの実装
pub struct WorkflowUseCaseImpl {
    definition_repo: Arc<dyn WorkflowDefinitionRepository>,
    workflow_repo: Arc<dyn DocumentWorkflowRepository>,
    approval_repo: Arc<dyn WorkflowApprovalRepository>,
    document_repo: Arc<dyn DocumentRepository>,
    permission_repo: Arc<dyn UserPermissionRepository>,
    user_repo: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    tx_manager: Arc<dyn TransactionManager>,
}

impl WorkflowUseCaseImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        definition_repo: Arc<dyn WorkflowDefinitionRepository>,
        workflow_repo: Arc<dyn DocumentWorkflowRepository>,
        approval_repo: Arc<dyn WorkflowApprovalRepository>,
        document_repo: Arc<dyn DocumentRepository>,
        permission_repo: Arc<dyn UserPermissionRepository>,
        user_repo: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
        tx_manager: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            definition_repo,
            workflow_repo,
            approval_repo,
            document_repo,
            permission_repo,
            user_repo,
            clock,
            tx_manager,
        }
    }
}

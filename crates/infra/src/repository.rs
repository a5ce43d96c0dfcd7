//! # リポジトリ
//!
//! トレイトと PostgreSQL 実装の組。ユースケース層はトレイト（`Arc<dyn ...>`）にのみ依存する。

pub mod document_repository;
pub mod document_workflow_repository;
pub mod number_sequence_repository;
pub mod user_permission_repository;
pub mod user_repository;
pub mod workflow_approval_repository;
pub mod workflow_definition_repository;

pub use document_repository::{DocumentRepository, PostgresDocumentRepository};
pub use document_workflow_repository::{
    DocumentWorkflowRepository,
    PostgresDocumentWorkflowRepository,
};
pub use number_sequence_repository::{NumberSequenceRepository, PostgresNumberSequenceRepository};
pub use user_permission_repository::{PostgresUserPermissionRepository, UserPermissionRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};
pub use workflow_approval_repository::{
    PostgresWorkflowApprovalRepository,
    WorkflowApprovalRepository,
};
pub use workflow_definition_repository::{
    PostgresWorkflowDefinitionRepository,
    Seeded,
    WorkflowDefinitionRepository,
};

//! # ワークフロー
//!
//! 文書種別ごとの状態機械（定義・状態・遷移）と、文書に結び付いた
//! 実行中インスタンス、承認記録を定義する。
//!
//! ## 構成
//!
//! - [`WorkflowDefinition`]: 文書種別ごとの設定（初期状態・承認閾値・権限）
//! - [`WorkflowState`] / [`WorkflowTransition`]: 状態グラフのノードと辺
//! - [`WorkflowGraph`]: 上記をまとめた読み込み結果。アクション解決の唯一の入口
//! - [`DocumentWorkflow`]: 文書 1 件の現在状態
//! - [`WorkflowApproval`]: 承認依頼 1 件の記録

pub mod approval;
pub mod definition;
pub mod graph;
pub mod instance;
pub mod state;
pub mod transition;

pub use approval::{
    ApprovalState,
    ApprovalStatus,
    DecidedState,
    NewWorkflowApproval,
    WorkflowApproval,
    WorkflowApprovalId,
    WorkflowApprovalRecord,
    auto_approval_comment,
};
pub use definition::{
    NewWorkflowDefinition,
    WorkflowDefinition,
    WorkflowDefinitionId,
    WorkflowDefinitionRecord,
};
pub use graph::WorkflowGraph;
pub use instance::{
    DocumentWorkflow,
    DocumentWorkflowId,
    DocumentWorkflowRecord,
    NewDocumentWorkflow,
};
pub use state::{NewWorkflowState, WorkflowState, WorkflowStateId, WorkflowStateRecord};
pub use transition::{
    ApprovalEffect,
    WorkflowTransition,
    WorkflowTransitionId,
    WorkflowTransitionRecord,
};

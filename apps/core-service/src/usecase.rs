//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・時計・トランザクションマネージャを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `workflow`: ワークフローの解決・承認要否・アクション実行・再開
//! - `document`: 文書の登録と備考の更新
//! - `setup`: ワークフロー定義のシード

pub(crate) mod helpers;

pub mod document;
pub mod setup;
pub mod workflow;

pub use document::{DocumentUseCaseImpl, NewDocumentInput, RegisteredDocument, UpdateNotesInput};
pub use setup::{SeedReport, SetupUseCaseImpl, WorkflowBlueprint};
pub use workflow::{
    ActionOutcome,
    AvailableAction,
    ReactivationOutcome,
    TransitionOutcome,
    WorkflowStatusView,
    WorkflowUseCaseImpl,
};

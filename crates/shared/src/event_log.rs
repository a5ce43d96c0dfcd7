//! # ビジネスイベントログ
//!
//! ワークフロー操作の結果を `jq` で追跡できるよう、ログフィールドの命名規約と
//! 出力マクロを提供する。
//!
//! フィールド名はドット記法（`event.category`、`event.action`）で、JSON 出力では
//! フラットなキーになる。
//!
//! ```text
//! jq 'select(.["event.kind"] == "business_event" and .["event.action"] == "approval.rejected")'
//! ```

/// ビジネスイベントを構造化ログとして出力する
///
/// `event.kind = "business_event"` を自動付与して `tracing::info!` で出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
///
/// ## 推奨フィールド
///
/// - `event.entity_type` / `event.entity_id`: 対象エンティティ
/// - `event.actor_id`: 操作者 ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const WORKFLOW: &str = "workflow";
        pub const APPROVAL: &str = "approval";
        pub const DOCUMENT: &str = "document";
        pub const SETUP: &str = "setup";
    }

    /// イベントアクション
    pub mod action {
        // ワークフロー
        pub const WORKFLOW_CREATED: &str = "workflow.created";
        pub const WORKFLOW_TRANSITIONED: &str = "workflow.transitioned";
        pub const WORKFLOW_REACTIVATED: &str = "workflow.reactivated";
        pub const WORKFLOW_SEEDED: &str = "workflow.seeded";

        // 承認
        pub const APPROVAL_REQUESTED: &str = "approval.requested";
        pub const APPROVAL_APPROVED: &str = "approval.approved";
        pub const APPROVAL_REJECTED: &str = "approval.rejected";
        pub const APPROVAL_WITHDRAWN: &str = "approval.withdrawn";

        // 文書
        pub const DOCUMENT_REGISTERED: &str = "document.registered";
        pub const DOCUMENT_UPDATED: &str = "document.updated";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const DOCUMENT: &str = "document";
        pub const DOCUMENT_WORKFLOW: &str = "document_workflow";
        pub const WORKFLOW_APPROVAL: &str = "workflow_approval";
        pub const WORKFLOW_DEFINITION: &str = "workflow_definition";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` に `error.category` と `error.kind` を直接付与して使う。
pub mod error {
    pub mod category {
        /// DB などのインフラストラクチャ
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// ワークフロー設定の不備
        pub const CONFIGURATION: &str = "configuration";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
        pub const WORKFLOW_MISSING: &str = "workflow_missing";
    }
}

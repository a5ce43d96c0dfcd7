//! # 文書アクションの業務エラーと入力
//!
//! `execute_action` / `reactivate` が返す業務エラーの分類。
//! いずれも文書とワークフローを変更しない「報告される結果」であり、
//! アクション呼び出し境界で `{ success, message }` 形式に変換される。

use thiserror::Error;

use crate::value_objects::Money;

/// 文書アクションの業務エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// ワークフロー定義、または定義の初期状態が設定されていない
    #[error("ワークフローが設定されていません: {0}")]
    ConfigurationMissing(String),

    /// 現在の状態から実行できないアクション
    #[error("現在の状態「{current}」ではアクション「{action}」を実行できません")]
    InvalidTransition {
        action:  String,
        current: String,
    },

    /// 操作者が必要な権限を持っていない
    #[error("この操作を行う権限がありません（必要な権限: {permission}）")]
    PermissionDenied { permission: String },

    /// ワークフローに存在しないアクション名
    #[error("不明なアクションです: {0}")]
    UnknownAction(String),

    /// 再開できないステータス
    #[error("ステータス「{status}」の文書は再開できません")]
    PreconditionFailed { status: String },

    /// アクションパラメータの不備（入金額の欠落など）
    #[error("入力エラー: {0}")]
    InvalidInput(String),
}

/// アクションの追加パラメータ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionParams {
    /// 承認・却下時のコメント
    pub comment: Option<String>,
    /// 一部入金の金額（請求書の `partial_payment` で必須）
    pub amount:  Option<Money>,
}

impl ActionParams {
    pub fn with_comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            amount:  None,
        }
    }

    pub fn with_amount(amount: Money) -> Self {
        Self {
            comment: None,
            amount:  Some(amount),
        }
    }
}

//! # ドメイン層エラー定義
//!
//! エンティティの不変条件違反やルール違反を表現するエラー型。
//! 文書アクションの業務エラー（不正遷移・権限不足など）は
//! [`ActionError`](crate::action::ActionError) で別に表現する。
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値・不変条件の検証失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 楽観的ロックの失敗 |
//! | `Forbidden` | 403 Forbidden | ロックされた項目の編集など |

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// - 必須項目が空
    /// - 閾値金額が 0 以下
    /// - 別ワークフローの状態を参照している
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"WorkflowDefinition", "Document" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー（楽観的ロック失敗など）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 状態によってロックされた項目を編集しようとした場合にも使用する。
    #[error("権限がありません: {0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_foundのメッセージにエンティティ種別とidが含まれる() {
        let error = DomainError::NotFound {
            entity_type: "WorkflowDefinition",
            id:          "purchase_order".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "WorkflowDefinition が見つかりません: purchase_order"
        );
    }
}

//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換やトランザクション操作など、
//! 複数のユースケースで繰り返されるパターンを共通化する。

use erpflow_infra::{InfraError, InfraErrorKind, TransactionManager, TxContext};

use crate::error::CoreError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// ```ignore
/// let document = self.document_repo.find(&document_ref).await.or_not_found("文書")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合は `CoreError::Database` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
        self?.ok_or_else(|| CoreError::NotFound(format!("{entity_name}が見つかりません")))
    }
}

/// バージョンチェック付き更新の競合を `CoreError::Conflict` に変換する
pub(crate) trait ConflictResultExt<T> {
    fn or_conflict(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> ConflictResultExt<T> for Result<T, InfraError> {
    fn or_conflict(self, entity_name: &str) -> Result<T, CoreError> {
        self.map_err(|e| match e.kind() {
            InfraErrorKind::Conflict { .. } => CoreError::Conflict(format!(
                "{entity_name}は既に更新されています。最新の情報を取得してください。"
            )),
            _ => CoreError::Database(e),
        })
    }
}

/// トランザクションを開始する
pub(crate) async fn begin_tx(tx_manager: &dyn TransactionManager) -> Result<TxContext, CoreError> {
    tx_manager
        .begin()
        .await
        .map_err(|e| CoreError::Internal(format!("トランザクション開始に失敗: {e}")))
}

/// トランザクションをコミットする
pub(crate) async fn commit_tx(tx: TxContext) -> Result<(), CoreError> {
    tx.commit()
        .await
        .map_err(|e| CoreError::Internal(format!("トランザクションコミットに失敗: {e}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // === FindResultExt ===

    #[test]
    fn test_or_not_found_ok_some_は値を返す() {
        let result: Result<Option<i32>, InfraError> = Ok(Some(42));

        assert_eq!(result.or_not_found("テスト").unwrap(), 42);
    }

    #[test]
    fn test_or_not_found_ok_none_はnotfoundエラーを返す() {
        let result: Result<Option<i32>, InfraError> = Ok(None);

        let err = result.or_not_found("文書").unwrap_err();

        match err {
            CoreError::NotFound(msg) => assert_eq!(msg, "文書が見つかりません"),
            other => panic!("NotFound を期待したが {:?} を受信", other),
        }
    }

    #[test]
    fn test_or_not_found_errはdatabaseエラーを返す() {
        let result: Result<Option<i32>, InfraError> = Err(InfraError::unexpected("接続失敗"));

        let err = result.or_not_found("文書").unwrap_err();

        assert!(matches!(err, CoreError::Database(_)));
    }

    // === ConflictResultExt ===

    #[test]
    fn test_or_conflict_競合はconflictエラーになる() {
        let result: Result<(), InfraError> = Err(InfraError::conflict("DocumentWorkflow", "1"));

        let err = result.or_conflict("文書ワークフロー").unwrap_err();

        match err {
            CoreError::Conflict(msg) => assert_eq!(
                msg,
                "文書ワークフローは既に更新されています。最新の情報を取得してください。"
            ),
            other => panic!("Conflict を期待したが {:?} を受信", other),
        }
    }

    #[test]
    fn test_or_conflict_競合以外はdatabaseエラーのまま() {
        let result: Result<(), InfraError> = Err(InfraError::unexpected("x"));

        assert!(matches!(
            result.or_conflict("文書ワークフロー"),
            Err(CoreError::Database(_))
        ));
    }
}

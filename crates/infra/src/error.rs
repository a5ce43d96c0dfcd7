//! # インフラ層のエラー
//!
//! エラー種別と発生時点の `SpanTrace` を組で保持する。
//! `SpanTrace` は `tracing_error::ErrorLayer` が登録されている場合にのみ中身を持つ。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// 種別による分岐には [`kind()`](InfraError::kind) を使う:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Conflict { entity, id } => { /* 競合処理 */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// SQL の実行失敗、接続エラー、制約違反など
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 楽観的ロック競合（バージョン不一致、または既に応答済みの承認）
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict {
        /// エンティティ名（例: "DocumentWorkflow"）
        entity: String,
        id:     String,
    },

    /// 呼び出し側の入力に起因するエラー（未登録の文書種別など）
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    /// DB 上のデータがドメインの不変条件を満たさないなど
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Conflict の場合のみ entity と id を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::InvalidInput(msg.into()))
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Unexpected(msg.into()))
    }

    fn with_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::with_kind(InfraErrorKind::Database(source))
    }
}

impl From<erpflow_domain::DomainError> for InfraError {
    /// DB から復元した値がドメインの検証に通らなかった場合
    fn from(source: erpflow_domain::DomainError) -> Self {
        Self::unexpected(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_sqlx_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("load_graph", document_type = "invoice");
            let _enter = span.enter();

            let err: InfraError = sqlx::Error::RowNotFound.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            let trace = format!("{}", err.span_trace());
            assert!(trace.contains("load_graph"), "SpanTrace がスパン名を含むこと: {trace}");
        });
    }

    #[test]
    fn test_conflictのdisplayとas_conflict() {
        let err = InfraError::conflict("DocumentWorkflow", "DW-001");

        assert_eq!(format!("{err}"), "競合が発生しました: DocumentWorkflow(id=DW-001)");
        assert_eq!(err.as_conflict(), Some(("DocumentWorkflow", "DW-001")));
    }

    #[test]
    fn test_conflict以外のas_conflictはnone() {
        assert!(InfraError::unexpected("壊れた行").as_conflict().is_none());
        assert!(InfraError::invalid_input("不正").as_conflict().is_none());
    }

    #[test]
    fn test_ドメインの検証エラーはunexpectedになる() {
        let err: InfraError =
            erpflow_domain::DomainError::Validation("不正な承認ステータス: x".to_string()).into();

        assert!(matches!(err.kind(), InfraErrorKind::Unexpected(msg) if msg.contains("承認ステータス")));
    }

    #[test]
    fn test_sourceは種別に委譲する() {
        use std::error::Error as _;

        let err: InfraError = sqlx::Error::RowNotFound.into();

        assert!(err.source().is_some());
    }
}

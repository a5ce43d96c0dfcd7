//! アクション呼び出し境界
//!
//! UI やクライアントから呼ばれる入口。業務エラーは `{ success: false, message }` として
//! 報告し、インフラ障害だけをエラーとして伝播させる。

use erpflow_domain::{action::ActionParams, document::DocumentRef, user::Actor};
use serde::{Deserialize, Serialize};

use super::WorkflowUseCaseImpl;
use crate::error::CoreError;

/// アクションの実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

fn report(document_ref: &DocumentRef, action: &str, err: CoreError) -> Result<ActionOutcome, CoreError> {
    if err.is_infrastructure() {
        return Err(err);
    }
    tracing::info!(
        document = %document_ref,
        workflow_action = action,
        reason = %err,
        "アクションは実行されませんでした"
    );
    Ok(ActionOutcome::failed(err.to_string()))
}

impl WorkflowUseCaseImpl {
    /// アクションを実行し、結果を `{ success, message }` で返す
    pub async fn invoke_action(
        &self,
        document_ref: &DocumentRef,
        action: &str,
        actor: &Actor,
        params: ActionParams,
    ) -> Result<ActionOutcome, CoreError> {
        match self.execute_action(document_ref, action, actor, params).await {
            Ok(outcome) => Ok(ActionOutcome::succeeded(format!(
                "「{}」を実行しました（現在の状態: {}）",
                outcome.transition.name(),
                outcome.workflow.current_state()
            ))),
            Err(e) => report(document_ref, action, e),
        }
    }

    /// 文書を再開し、結果を `{ success, message }` で返す
    pub async fn invoke_reactivation(
        &self,
        document_ref: &DocumentRef,
        actor: &Actor,
    ) -> Result<ActionOutcome, CoreError> {
        match self.reactivate(document_ref, actor).await {
            Ok(outcome) => Ok(ActionOutcome::succeeded(format!(
                "文書を再開しました（ステータス: {}）",
                outcome.status
            ))),
            Err(e) => report(document_ref, "reactivate", e),
        }
    }
}

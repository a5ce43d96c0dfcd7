//! # 権限
//!
//! 遷移ごとに要求される権限コードと、ユーザーへの権限付与を表現する。
//!
//! 判定規則:
//!
//! - スーパーユーザーはすべてのチェックをバイパスする
//! - 権限コードが要求されていない遷移は誰でも実行できる
//! - 権限コードが要求されている場合、有効な付与が 1 件以上必要
//! - 承認系の遷移では、付与に承認上限 `approval_limit` があれば文書金額が上限以下であること

use serde::{Deserialize, Serialize};

use crate::{
    action::ActionError,
    user::{Actor, UserId},
    value_objects::Money,
};

define_validated_string! {
    /// 権限コード（`approve_purchase_orders` など）
    pub struct PermissionCode {
        label: "権限コード",
        max_length: 100,
    }
}

/// ユーザーへの権限付与
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub user_id:         UserId,
    pub permission_code: PermissionCode,
    pub is_active:       bool,
    /// 承認できる金額の上限（未設定は無制限）
    pub approval_limit:  Option<Money>,
}

impl PermissionGrant {
    /// 有効な無制限の付与を作成する
    pub fn active(user_id: UserId, permission_code: PermissionCode) -> Self {
        Self {
            user_id,
            permission_code,
            is_active: true,
            approval_limit: None,
        }
    }

    pub fn with_approval_limit(mut self, limit: Money) -> Self {
        self.approval_limit = Some(limit);
        self
    }

    fn covers(&self, amount: Option<Money>) -> bool {
        match (self.approval_limit, amount) {
            (Some(limit), Some(amount)) => amount <= limit,
            _ => true,
        }
    }
}

/// 操作者が権限コードを満たすか判定する
///
/// `amount` は承認上限を確認する場合のみ渡す。
///
/// # エラー
///
/// 有効な付与がない、または承認上限を超える場合は `ActionError::PermissionDenied`
pub fn authorize(
    actor: &Actor,
    required: Option<&PermissionCode>,
    grants: &[PermissionGrant],
    amount: Option<Money>,
) -> Result<(), ActionError> {
    if actor.is_superuser() {
        return Ok(());
    }
    let Some(required) = required else {
        return Ok(());
    };

    let mut matching = grants
        .iter()
        .filter(|g| g.is_active && &g.user_id == actor.id() && &g.permission_code == required)
        .peekable();

    if matching.peek().is_none() {
        return Err(ActionError::PermissionDenied {
            permission: required.to_string(),
        });
    }

    if matching.any(|g| g.covers(amount)) {
        Ok(())
    } else {
        Err(ActionError::PermissionDenied {
            permission: format!("{required}（承認上限超過）"),
        })
    }
}

/// 再開（reactivate）の権限を判定する
///
/// 再開は管理者向けの例外操作のため、権限コードが設定されていない場合は
/// スーパーユーザーのみ実行できる。
pub fn authorize_reactivation(
    actor: &Actor,
    required: Option<&PermissionCode>,
    grants: &[PermissionGrant],
) -> Result<(), ActionError> {
    match required {
        Some(code) => authorize(actor, Some(code), grants, None),
        None if actor.is_superuser() => Ok(()),
        None => Err(ActionError::PermissionDenied {
            permission: "superuser".to_string(),
        }),
    }
}

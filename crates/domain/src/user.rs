//! # ユーザーと操作者
//!
//! ユーザー管理そのものは外部の責務。ワークフローエンジンが必要とするのは
//! 操作者の ID とスーパーユーザーかどうかの 2 点だけである。

use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

/// アクションを実行する操作者
///
/// スーパーユーザーはすべての権限チェックをバイパスする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    id:           UserId,
    is_superuser: bool,
}

impl Actor {
    pub fn new(id: UserId, is_superuser: bool) -> Self {
        Self { id, is_superuser }
    }

    /// 一般ユーザーの操作者を作成する
    pub fn user(id: UserId) -> Self {
        Self::new(id, false)
    }

    /// スーパーユーザーの操作者を作成する
    pub fn superuser(id: UserId) -> Self {
        Self::new(id, true)
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

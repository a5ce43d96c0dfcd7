//! # UserRepository
//!
//! 操作者の解決。スーパーユーザーかどうかはリクエストではなく `users` テーブルで判定する。

use async_trait::async_trait;
use erpflow_domain::user::{Actor, UserId};
use sqlx::PgPool;

use crate::error::InfraError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザー ID から操作者を取得する
    ///
    /// 無効化されたユーザーはスーパーユーザーとして扱わない。
    async fn find_actor(&self, user_id: &UserId) -> Result<Option<Actor>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    is_superuser: bool,
    is_active:    bool,
}

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_actor(&self, user_id: &UserId) -> Result<Option<Actor>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT is_superuser, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Actor::new(user_id.clone(), r.is_superuser && r.is_active)))
    }
}

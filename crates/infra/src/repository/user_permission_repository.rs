//! # UserPermissionRepository
//!
//! ユーザーへの権限付与の読み込み。

use async_trait::async_trait;
use erpflow_domain::{
    permission::{PermissionCode, PermissionGrant},
    user::UserId,
    value_objects::Money,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

#[async_trait]
pub trait UserPermissionRepository: Send + Sync {
    /// ユーザーの権限付与を取得する（無効化されたものも含む）
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<PermissionGrant>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserPermissionRow {
    user_id: Uuid,
    permission_code: String,
    is_active: bool,
    approval_limit: Option<Decimal>,
}

impl TryFrom<UserPermissionRow> for PermissionGrant {
    type Error = InfraError;

    fn try_from(row: UserPermissionRow) -> Result<Self, Self::Error> {
        Ok(PermissionGrant {
            user_id: UserId::from_uuid(row.user_id),
            permission_code: PermissionCode::new(row.permission_code)?,
            is_active: row.is_active,
            approval_limit: row.approval_limit.map(Money::new).transpose()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PostgresUserPermissionRepository {
    pool: PgPool,
}

impl PostgresUserPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserPermissionRepository for PostgresUserPermissionRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<PermissionGrant>, InfraError> {
        sqlx::query_as::<_, UserPermissionRow>(
            r#"
            SELECT user_id, permission_code, is_active, approval_limit
            FROM user_permissions
            WHERE user_id = $1
            ORDER BY permission_code
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(PermissionGrant::try_from)
        .collect()
    }
}

//! # NumberSequenceRepository
//!
//! 文書番号の採番カウンター。
//!
//! - `SELECT FOR UPDATE` でカウンター行を排他ロックし、同じ番号が二度発行されないようにする
//! - 採番は内部でトランザクションを開始・コミットし、呼び出し側の
//!   トランザクションとは独立している（ロールバックされた採番は欠番になる）
//! - 振り直し周期の判定に使うため、払い出し日を行に記録する

use async_trait::async_trait;
use chrono::NaiveDate;
use erpflow_domain::{
    document::DocumentKind,
    sequence::{NumberSequence, NumberSequenceRecord},
};
use sqlx::PgPool;

use crate::error::InfraError;

#[async_trait]
pub trait NumberSequenceRepository: Send + Sync {
    /// `today` の日付で次の文書番号を発行する
    ///
    /// # Errors
    ///
    /// - カウンター行が存在しない場合は `InfraErrorKind::Unexpected`
    async fn next_document_no(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<String, InfraError>;
}

#[derive(sqlx::FromRow)]
struct NumberSequenceRow {
    prefix: String,
    suffix: String,
    current_next: i64,
    increment: i64,
    padding: i32,
    restart_every: String,
    start_no: i64,
    last_issued_on: Option<NaiveDate>,
}

/// PostgreSQL 実装
///
/// `number_sequences` テーブルを使用する。
#[derive(Debug, Clone)]
pub struct PostgresNumberSequenceRepository {
    pool: PgPool,
}

impl PostgresNumberSequenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NumberSequenceRepository for PostgresNumberSequenceRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%kind))]
    async fn next_document_no(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<String, InfraError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, NumberSequenceRow>(
            r#"
            SELECT prefix, suffix, current_next, increment, padding,
                   restart_every, start_no, last_issued_on
            FROM number_sequences
            WHERE document_type = $1
            FOR UPDATE
            "#,
        )
        .bind(kind.document_type())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            InfraError::unexpected(format!("採番カウンターが見つかりません: {kind}"))
        })?;

        let sequence = NumberSequence::from_db(NumberSequenceRecord {
            document_kind: kind,
            prefix: row.prefix,
            suffix: row.suffix,
            current_next: row.current_next,
            increment: row.increment,
            padding: row.padding,
            restart_every: row.restart_every,
            start_no: row.start_no,
            last_issued_on: row.last_issued_on,
        })?;
        let (document_no, advanced) = sequence.issue(today);

        sqlx::query(
            r#"
            UPDATE number_sequences
            SET current_next = $2, last_issued_on = $3
            WHERE document_type = $1
            "#,
        )
        .bind(kind.document_type())
        .bind(advanced.current_next())
        .bind(advanced.last_issued_on())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(document_no)
    }
}

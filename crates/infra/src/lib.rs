//! # ERPFlow インフラ層
//!
//! PostgreSQL への永続化を担当する。
//!
//! - [`db`] - 接続プール、マイグレーション、トランザクション（[`TxContext`]）
//! - [`repository`] - リポジトリトレイトと PostgreSQL 実装
//! - [`mock`] - ユースケーステスト用のインメモリ実装（`test-utils` feature）
//!
//! 書き込みメソッドはすべて `&mut TxContext` を要求する。ワークフロー行と文書行の
//! 更新は同じトランザクションで行い、どちらか一方だけが反映されることはない。

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use db::{PgTransactionManager, TransactionManager, TxContext};
pub use error::{InfraError, InfraErrorKind};

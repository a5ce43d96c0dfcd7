//! # ERPFlow ドメイン層
//!
//! 業務文書（受注・発注・請求書・出荷）のワークフローエンジンの中核となる
//! ドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB）に一切依存しない。時刻は [`clock::Clock`] で注入し、
//! 状態遷移はすべて値を消費して新しい値を返す純粋な操作として表現する。
//!
//! ## モジュール構成
//!
//! - [`workflow`] - ワークフロー定義・状態・遷移・文書ワークフロー・承認
//! - [`document`] - 業務文書と多態参照
//! - [`lifecycle`] - 遷移に伴う文書の変更、再開、承認要否、項目ロック
//! - [`permission`] - 権限付与と判定
//! - [`sequence`] - 文書番号の採番
//! - [`action`] - アクションの業務エラーとパラメータ
//!
//! ## 使用例
//!
//! ```rust
//! use erpflow_domain::{DomainError, document::DocumentKind};
//!
//! let kind: DocumentKind = "purchase_order".parse()?;
//! assert_eq!(kind.document_type(), "purchase_order");
//! # Ok::<(), DomainError>(())
//! ```

#[macro_use]
mod macros;

pub mod action;
pub mod clock;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod permission;
pub mod sequence;
pub mod user;
pub mod value_objects;
pub mod workflow;

pub use error::DomainError;

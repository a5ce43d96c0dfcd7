//! # Core Service ライブラリ
//!
//! 文書ワークフローのユースケースと HTTP ハンドラを公開する。
//! サーバー本体（`main.rs`）とシード用バイナリ（`setup_workflows`）の両方から使う。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

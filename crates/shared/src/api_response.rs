//! # API レスポンスエンベロープ
//!
//! 内部 API の成功レスポンスを `{ "data": T }` に統一する。

use serde::{Deserialize, Serialize};

/// 成功レスポンスのエンベロープ
///
/// ```
/// use erpflow_shared::ApiResponse;
///
/// let response = ApiResponse::new(vec!["approve", "reject"]);
/// assert_eq!(response.data.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

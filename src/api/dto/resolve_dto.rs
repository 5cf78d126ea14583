//! 解析 DTO
//!
//! 定义解析接口的响应数据结构。请求体即 `DialogTurn`。

use serde::{Deserialize, Serialize};

use crate::models::ResponseBundle;

/// 解析响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// 请求 ID
    pub request_id: String,
    /// 耗时（毫秒）
    pub took_ms: u64,
    /// 三路解析结果
    pub bundle: ResponseBundle,
}

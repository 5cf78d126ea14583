//! Resolve Routes
//!
//! 定义对话解析相关的 API 路由。

use crate::api::handlers::resolve_handler::*;
use axum::{Router, routing::post};

use crate::api::app_state::AppState;

/// 创建解析路由器
pub fn create_resolve_router() -> Router<AppState> {
    Router::new().route("/resolve", post(resolve_turn))
}

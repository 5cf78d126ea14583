//! 错误处理模块
//!
//! 定义解析引擎的错误类型和错误处理逻辑。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 搜索服务调用失败
    #[error("搜索服务调用失败: {0}")]
    Search(String),

    /// 内容获取失败
    #[error("内容获取失败: {0}")]
    ContentFetch(String),

    /// 内容格式错误（附件或快捷回复缺少必要元素）
    #[error("内容格式错误: {0}")]
    MalformedContent(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the error originated from an upstream collaborator call.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, AppError::Search(_) | AppError::ContentFetch(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl AppError {
    /// 构造带请求 ID 的错误响应
    pub fn into_response_with_request_id(self, request_id: &str) -> Response {
        let (status, code) = (&self).into();
        let body = ErrorResponse::new(&code, &self.to_string()).with_request_id(request_id);
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body),
        )
            .into_response()
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        let body = Json(ErrorResponse::new(&code, &self.to_string()));
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response()
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息
    pub message: String,
    /// 请求 ID
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        }
    }

    /// 添加请求 ID
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::Search(_) => (502, "SEARCH_UNAVAILABLE".to_string()),
            AppError::ContentFetch(_) => (502, "CONTENT_UNAVAILABLE".to_string()),
            AppError::MalformedContent(_) => (502, "MALFORMED_CONTENT".to_string()),
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

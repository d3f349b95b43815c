//! 错误处理模块
//!
//! 定义偏好引擎的错误类型。外部调用失败（画像源、分析预言机）在调用点被捕获，
//! 只有 `InvariantViolation` 会中断触发它的操作。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// 画像源不可用（调用失败或超时）
    #[error("profile source unavailable: {0}")]
    SourceUnavailable(String),

    /// 分析预言机不可用
    #[error("analysis oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// 外部服务返回的数据不符合约定的 schema
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// 调用方违反契约（编程错误）
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// 超时错误
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// HTTP 传输错误
    #[error("http error: {0}")]
    Http(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// 序列化错误
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(String),

    /// 内部错误
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 是否为可重试的瞬时错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::SourceUnavailable(_)
                | AppError::OracleUnavailable(_)
                | AppError::MalformedResponse(_)
                | AppError::Timeout(_)
                | AppError::Http(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
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

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else if e.is_decode() {
            AppError::MalformedResponse(e.to_string())
        } else {
            AppError::Http(e.to_string())
        }
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        let mut response = ErrorResponse::new(&code, &self.to_string());
        if self.is_retryable() {
            response = response.with_details("retryable");
        }
        let body = Json(response);
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
    /// 详细信息
    pub details: Option<String>,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// 添加详细信息
    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::InvariantViolation(_) => (409, "CONFLICT".to_string()),
            AppError::SourceUnavailable(_) | AppError::OracleUnavailable(_) => {
                (503, "SERVICE_UNAVAILABLE".to_string())
            }
            AppError::MalformedResponse(_) | AppError::Http(_) => (502, "BAD_GATEWAY".to_string()),
            AppError::Timeout(_) => (504, "TIMEOUT".to_string()),
            AppError::Config(_) => (500, "CONFIG_ERROR".to_string()),
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

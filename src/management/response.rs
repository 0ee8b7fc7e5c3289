//! # API 响应结构
//!
//! 定义了标准的 JSON API 响应格式，包括成功与失败响应。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, lwarn};

/// # 标准成功响应
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// # 标准错误信息
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// # 标准错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
    pub timestamp: DateTime<Utc>,
}

/// # API响应枚举
///
/// 统一所有API出口，方便转换为 `axum::response::Response`
#[derive(Debug)]
pub enum ApiResponse<T: Serialize> {
    Success(T),
    SuccessWithMessage(T, String),
    Created(T, String),
    Error(StatusCode, String, String),
    AppError(GatewayError),
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success(data) => ok_body(StatusCode::OK, data, "操作成功".to_string()),
            Self::SuccessWithMessage(data, message) => ok_body(StatusCode::OK, data, message),
            Self::Created(data, message) => ok_body(StatusCode::CREATED, data, message),
            Self::Error(status, code, message) => error_body(status, code, message),
            Self::AppError(error) => {
                let (status, code) = error.to_http_response_parts();
                if status.is_server_error() {
                    lerror!(
                        "system",
                        LogStage::Management,
                        LogComponent::Management,
                        "request_failed",
                        "管理接口请求失败",
                        status = status.as_u16(),
                        code = code,
                        error = ?error
                    );
                } else {
                    lwarn!(
                        "system",
                        LogStage::Management,
                        LogComponent::Management,
                        "request_rejected",
                        "管理接口请求被拒绝",
                        status = status.as_u16(),
                        code = code,
                        error = %error
                    );
                }
                error_body(status, code.to_string(), error.to_string())
            }
        }
    }
}

fn ok_body<T: Serialize>(status: StatusCode, data: T, message: String) -> Response {
    (
        status,
        Json(SuccessResponse {
            success: true,
            data: Some(data),
            message: Some(message),
            timestamp: Utc::now(),
        }),
    )
        .into_response()
}

fn error_body(status: StatusCode, code: String, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: ErrorInfo { code, message },
            timestamp: Utc::now(),
        }),
    )
        .into_response()
}

/// # 便捷函数：成功响应
pub fn success<T: Serialize>(data: T) -> Response {
    ApiResponse::Success(data).into_response()
}

/// # 便捷函数：带消息的成功响应
pub fn success_with_message<T: Serialize>(data: T, message: &str) -> Response {
    ApiResponse::SuccessWithMessage(data, message.to_string()).into_response()
}

/// # 便捷函数：创建成功响应（201）
pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    ApiResponse::Created(data, message.to_string()).into_response()
}

/// # 便捷函数：HTTP错误响应
pub fn error(status: StatusCode, code: &str, message: &str) -> Response {
    ApiResponse::<()>::Error(status, code.to_string(), message.to_string()).into_response()
}

/// # 便捷函数：应用错误响应
pub fn app_error(error: GatewayError) -> Response {
    ApiResponse::<()>::AppError(error).into_response()
}

//! 统一错误处理
//!
//! 错误类型定义在 `shared::error`，这里统一转发并提供响应辅助函数：
//! - [`AppError`] - 应用错误 (错误码 + 消息)
//! - [`ApiResponse`] - API 响应结构
//!
//! # 错误码规范
//!
//! | 区段 | 分类 | 示例 |
//! |------|------|------|
//! | 4xxx | Admission 错误 | 4004 admission 不存在 |
//! | 5xxx | Payment 错误 | 5003 超额付款 |
//! | 6xxx | 并发错误 | 6001 版本冲突 |
//! | 94xx | 存储错误 | 9401 数据库错误 |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::new(ErrorCode::AdmissionNotFound))
//!
//! // 返回成功响应
//! Ok(ok(data))
//! ```

use axum::Json;
use serde::Serialize;

pub use shared::error::{ApiResponse, AppError, ErrorCategory, ErrorCode};

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success_with_message(message, data))
}

//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`admissions`] - 入学台账接口 (注册 / 缴费 / 清算 / 查询)
//! - [`students`] - 学生财务汇总接口
//!
//! # 路由表
//!
//! | 方法 | 路径 | 说明 |
//! |------|------|------|
//! | GET  | /health | 健康检查 |
//! | POST | /api/admissions | 注册入学 |
//! | GET  | /api/admissions/{id} | 台账快照 |
//! | GET  | /api/admissions/{id}/summary | 入学汇总 (含 OVERDUE 推导) |
//! | GET  | /api/admissions/{id}/history | 付款历史 |
//! | POST | /api/admissions/{id}/installments/{no}/payments | 记录付款 |
//! | POST | /api/admissions/{id}/installments/{no}/clearance | 支票清算 |
//! | GET  | /api/students/{id}/summary | 学生跨入学汇总 |

pub mod admissions;
pub mod health;
pub mod students;

// Re-export common types for handlers
pub use crate::utils::{ApiResponse, AppError, AppResult};

use crate::ledger::ManagerError;
use shared::ledger::CommandError;

/// Map a manager error to the API error taxonomy
pub(crate) fn manager_error(err: ManagerError) -> AppError {
    let e = CommandError::from(err);
    AppError::with_message(e.code.into(), e.message)
}

/// Run a blocking storage call off the async executor
pub(crate) async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Blocking task failed: {}", e)))
}

//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 简单健康检查 | 无 |
//! | /health/detailed | GET | 详细健康检查 | 无 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "epoch": "c1f2...",
//!   "current_sequence": 42
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 简单健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (healthy | degraded)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 事件流纪元 (每次数据库新建时生成)
    epoch: String,
    /// 当前事件序号
    current_sequence: u64,
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    /// 各组件检查结果
    checks: HealthChecks,
}

/// 健康检查详情
#[derive(Serialize)]
pub struct HealthChecks {
    /// 存储检查
    storage: CheckResult,
    /// 事件广播扇出检查
    event_stream: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | error)
    status: &'static str,
    /// 延迟 (毫秒)
    latency_ms: Option<u64>,
    /// 错误信息
    message: Option<String>,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            status: "ok",
            latency_ms: None,
            message: None,
        }
    }

    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 基础健康检查
///
/// 包含事件流纪元和当前序号，客户端可用来判断是否需要重新同步
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let current_sequence = state.manager.get_current_sequence().unwrap_or(0);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.manager.epoch().to_string(),
        current_sequence,
    })
}

/// 包含组件状态的详细健康检查
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    // 检查存储: 遍历各表统计验证数据库可读
    let storage_start = std::time::Instant::now();
    let storage_check = match state.manager.storage().get_stats() {
        Ok(stats) => {
            let mut check =
                CheckResult::ok_with_latency(storage_start.elapsed().as_millis() as u64);
            check.message = Some(format!(
                "{} events, {} snapshots, sequence {}",
                stats.event_count, stats.snapshot_count, stats.current_sequence
            ));
            check
        }
        Err(e) => CheckResult::error(format!("Storage error: {}", e)),
    };

    // 检查事件扇出: 已广播高水位不能超过存储序号
    // (缓存是进程内的，重启后从 0 开始，落后是正常的)
    let stream_check = match state.manager.get_current_sequence() {
        Ok(stored) => {
            let broadcast = state.admission_versions.high_water();
            if broadcast > stored {
                CheckResult::error(format!(
                    "Broadcast high-water {} ahead of stored sequence {}",
                    broadcast, stored
                ))
            } else {
                CheckResult::ok()
            }
        }
        Err(e) => CheckResult::error(format!("Sequence read error: {}", e)),
    };

    let all_ok = storage_check.status == "ok" && stream_check.status == "ok";

    Json(DetailedHealthResponse {
        status: if all_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks {
            storage: storage_check,
            event_stream: stream_check,
        },
    })
}

//! Ledger Server - 分期付款台账与对账引擎
//!
//! # 架构概述
//!
//! 本模块是 Ledger Server 的主入口，提供以下核心功能：
//!
//! - **台账引擎** (`ledger`): 命令/事件溯源的入学缴费台账
//! - **存储** (`ledger::storage`): 嵌入式 redb 事件与快照存储
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! ledger-server/src/
//! ├── core/          # 配置、状态、服务器生命周期
//! ├── ledger/        # 命令处理、事件应用、存储
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、错误工具
//! ```

pub mod api;
pub mod core;
pub mod ledger;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use ledger::{LedgerManager, LedgerStorage, ManagerError, ManagerResult};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: dotenv + 日志
///
/// 必须在 [`Config::from_env`] 之前调用以加载 .env 文件
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __              __
   / /   ___  ____/ /___ ____  _____
  / /   / _ \/ __  / __ `/ _ \/ ___/
 / /___/  __/ /_/ / /_/ /  __/ /
/_____/\___/\__,_/\__, /\___/_/
                 /____/
    "#
    );
}

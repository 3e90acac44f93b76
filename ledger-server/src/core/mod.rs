//! 核心模块 - 服务器骨架
//!
//! | 模块 | 说明 |
//! |------|------|
//! | config | 环境变量配置 |
//! | error | 服务器级错误类型 |
//! | server | HTTP 服务器生命周期 |
//! | state | 共享状态 (管理器 + 序号跟踪) |

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::{AdmissionVersions, ServerState};

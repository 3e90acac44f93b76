use std::net::SocketAddr;

use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::core::{Config, Result, ServerState};

/// 单写事务存储, 限制并发请求数避免阻塞任务堆积
const MAX_IN_FLIGHT_REQUESTS: usize = 256;

/// HTTP 服务器
///
/// 负责：
/// 1. 初始化服务器状态 (如未注入)
/// 2. 启动后台任务
/// 3. 组装路由并监听 HTTP 端口
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    /// 从配置创建服务器，状态将在 `run()` 时初始化
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// 使用预先构造的状态创建服务器 (测试用)
    pub fn with_state(state: ServerState) -> Self {
        Self {
            config: state.config.clone(),
            state: Some(state),
        }
    }

    /// 运行服务器直到收到退出信号 (Ctrl+C)
    pub async fn run(self) -> Result<()> {
        let state = match self.state {
            Some(state) => state,
            None => ServerState::initialize(&self.config).await,
        };

        state.start_background_tasks();

        let app = Self::build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(anyhow::Error::from)?;

        tracing::info!(
            addr = %addr,
            environment = %self.config.environment,
            epoch = %state.manager.epoch(),
            "Ledger server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(anyhow::Error::from)?;

        tracing::info!("Ledger server stopped");
        Ok(())
    }

    /// 组装完整路由树
    pub fn build_router(state: ServerState) -> Router {
        Router::new()
            .merge(api::health::router())
            .merge(api::admissions::router())
            .merge(api::students::router())
            .layer(TraceLayer::new_for_http())
            .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT_REQUESTS))
            .with_state(state)
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => tracing::error!(error = %err, "Failed to listen for shutdown signal"),
    }
}

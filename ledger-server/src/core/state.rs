use dashmap::DashMap;
use std::sync::Arc;

use crate::core::Config;
use crate::ledger::LedgerManager;

/// 已广播事件序号跟踪器
///
/// 使用 DashMap 实现无锁并发。每个 admission 记录其最后广播的事件
/// 序号，后台事件监听任务负责更新。
///
/// # 使用场景
///
/// 详细健康检查用它对比广播高水位与存储序号，判断事件扇出是否滞后。
#[derive(Debug)]
pub struct AdmissionVersions {
    sequences: DashMap<String, u64>,
}

impl AdmissionVersions {
    /// 创建空的跟踪器
    pub fn new() -> Self {
        Self {
            sequences: DashMap::new(),
        }
    }

    /// 记录某 admission 的事件序号 (只增不减)
    pub fn record(&self, admission_id: &str, sequence: u64) {
        let mut entry = self
            .sequences
            .entry(admission_id.to_string())
            .or_insert(0);
        if sequence > *entry {
            *entry = sequence;
        }
    }

    /// 获取某 admission 最后广播的序号，未知返回 0
    pub fn get(&self, admission_id: &str) -> u64 {
        self.sequences.get(admission_id).map(|v| *v).unwrap_or(0)
    }

    /// 跟踪到的 admission 数量
    pub fn tracked_count(&self) -> usize {
        self.sequences.len()
    }

    /// 所有 admission 中最高的已广播序号
    pub fn high_water(&self) -> u64 {
        self.sequences.iter().map(|e| *e.value()).max().unwrap_or(0)
    }
}

impl Default for AdmissionVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | manager | Arc<LedgerManager> | 台账命令处理器 |
/// | admission_versions | Arc<AdmissionVersions> | 已广播序号跟踪 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 台账管理器 (命令处理 + 查询)
    pub manager: Arc<LedgerManager>,
    /// 已广播事件序号跟踪器
    pub admission_versions: Arc<AdmissionVersions>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 方法代替
    pub fn new(config: Config, manager: Arc<LedgerManager>) -> Self {
        Self {
            config,
            manager,
            admission_versions: Arc::new(AdmissionVersions::new()),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 台账数据库 (work_dir/database/ledger.db)
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_path();
        let manager = LedgerManager::new(&db_path, config.business_timezone())
            .expect("Failed to open ledger database");

        tracing::info!(
            db_path = %db_path.display(),
            timezone = %config.timezone,
            "Ledger manager initialized"
        );

        Self::new(config.clone(), Arc::new(manager))
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 事件监听器：更新已广播序号跟踪器
    pub fn start_background_tasks(&self) {
        let mut rx = self.manager.subscribe();
        let versions = self.admission_versions.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        versions.record(&event.admission_id, event.sequence);
                        tracing::debug!(
                            admission_id = %event.admission_id,
                            sequence = event.sequence,
                            event_type = ?event.event_type,
                            "Ledger event broadcast"
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Event listener lagged behind broadcast");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// 获取台账管理器
    pub fn manager(&self) -> &Arc<LedgerManager> {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_versions_record_keeps_max() {
        let versions = AdmissionVersions::new();
        assert_eq!(versions.get("adm-1"), 0);

        versions.record("adm-1", 3);
        versions.record("adm-1", 2); // stale update ignored
        assert_eq!(versions.get("adm-1"), 3);

        versions.record("adm-2", 7);
        assert_eq!(versions.tracked_count(), 2);
        assert_eq!(versions.high_water(), 7);
    }
}

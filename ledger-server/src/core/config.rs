use chrono_tz::Tz;
use std::path::PathBuf;

/// 服务器配置 - 学院收费台账节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/ledger | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | Asia/Kolkata | 逾期判定使用的营业时区 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志目录，设置后写入滚动文件 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/ledger HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 营业时区 (IANA 名称，如 Asia/Kolkata)
    pub timezone: String,
    /// 日志级别
    pub log_level: String,
    /// 日志目录 (可选，设置后启用滚动文件日志)
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/ledger".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: std::env::var("TIMEZONE").unwrap_or_else(|_| "Asia/Kolkata".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 台账数据库路径 (work_dir/database/ledger.db)
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("ledger.db")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// 解析营业时区，无效名称回退到 Asia/Kolkata
    pub fn business_timezone(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(
                timezone = %self.timezone,
                "Unknown TIMEZONE value, falling back to Asia/Kolkata"
            );
            chrono_tz::Asia::Kolkata
        })
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides("/tmp/ledger-test", 8080);
        assert_eq!(config.work_dir, "/tmp/ledger-test");
        assert_eq!(config.http_port, 8080);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/ledger-test/database/ledger.db")
        );
    }

    #[test]
    fn test_invalid_timezone_falls_back() {
        let mut config = Config::with_overrides("/tmp/ledger-test", 8080);
        config.timezone = "Not/AZone".to_string();
        assert_eq!(config.business_timezone(), chrono_tz::Asia::Kolkata);

        config.timezone = "Asia/Dubai".to_string();
        assert_eq!(config.business_timezone(), chrono_tz::Asia::Dubai);
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含队列、工作器池、爬虫、会话池和扫描默认值等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 任务队列配置
    pub queue: QueueSettings,
    /// 工作器池配置
    pub workers: WorkerSettings,
    /// 爬虫配置
    pub crawler: CrawlerSettings,
    /// 页面会话池配置
    pub sessions: SessionSettings,
    /// 扫描默认值配置
    pub scan: ScanSettings,
}

/// 任务队列配置设置
#[derive(Debug, Deserialize)]
pub struct QueueSettings {
    /// 待处理任务容量上限
    pub capacity: usize,
    /// 单任务最大重试次数
    pub max_retries: u32,
}

/// 工作器池配置设置
#[derive(Debug, Deserialize)]
pub struct WorkerSettings {
    /// 工作器数量
    pub count: usize,
    /// 单任务硬超时（秒）
    pub job_timeout_secs: u64,
    /// 出队轮询超时（毫秒）
    pub poll_timeout_ms: u64,
    /// 关停宽限期（秒）
    pub shutdown_grace_secs: u64,
}

/// 爬虫配置设置
#[derive(Debug, Deserialize)]
pub struct CrawlerSettings {
    /// 每层并发抓取数
    pub fetch_concurrency: usize,
}

/// 页面会话池配置设置
#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// 会话池大小（同时抓取分析的页面数上限）
    pub pool_size: usize,
    /// 页面抓取超时（秒）
    pub fetch_timeout_secs: u64,
}

/// 扫描默认值配置设置
#[derive(Debug, Deserialize)]
pub struct ScanSettings {
    /// 默认最大爬取深度
    pub max_depth: u32,
    /// 默认最大页面数
    pub max_pages: usize,
    /// 同时在途的单页扫描任务数
    pub concurrency: usize,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 所有配置项都有内置默认值，之后依次被配置文件和
    /// 环境变量覆盖
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default queue settings
            .set_default("queue.capacity", 1000)?
            .set_default("queue.max_retries", 3)?
            // Default worker pool settings
            .set_default("workers.count", 4)?
            .set_default("workers.job_timeout_secs", 60)?
            .set_default("workers.poll_timeout_ms", 200)?
            .set_default("workers.shutdown_grace_secs", 10)?
            // Default crawler settings
            .set_default("crawler.fetch_concurrency", 4)?
            // Default session pool settings
            .set_default("sessions.pool_size", 4)?
            .set_default("sessions.fetch_timeout_secs", 30)?
            // Default scan settings
            .set_default("scan.max_depth", 3)?
            .set_default("scan.max_pages", 100)?
            .set_default("scan.concurrency", 4)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("A11YSCAN").separator("__"));

        builder.build()?.try_deserialize()
    }
}

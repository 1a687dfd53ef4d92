// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analyzers::traits::{Analyzer, Page};
use crate::analyzers::session::SessionPool;
use crate::domain::models::finding::RawFinding;
use crate::domain::models::job::Job;
use crate::domain::models::scan::PageScanPayload;
use crate::utils::errors::{AnalyzerError, JobError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 单个分析器的执行上限，挂住的分析器不拖垮整个任务
const ANALYZER_TIMEOUT: Duration = Duration::from_secs(30);

/// 任务执行器特质
///
/// 工作器对认领到的任务调用对应类型的执行器
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// 执行任务
    ///
    /// # 参数
    ///
    /// * `job` - 已认领的任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Option<Value>)` - 执行成功，可携带结果负载
    /// * `Err(JobError)` - 执行失败，由队列决定是否重试
    async fn execute(&self, job: &Job) -> Result<Option<serde_json::Value>, JobError>;
}

/// 单页扫描结果
///
/// 以JSON写回任务表，编排器据此收集原始检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageScanOutcome {
    /// 页面URL
    pub url: String,
    /// 原始检测结果
    pub findings: Vec<RawFinding>,
    /// 扫描耗时（毫秒）
    pub duration_ms: u64,
}

/// 单页扫描执行器
///
/// 从会话池获取会话、抓取页面、运行启用的分析器并
/// 归并其原始检测结果
pub struct PageScanExecutor {
    /// 页面会话池
    sessions: Arc<SessionPool>,
    /// 已注册的分析器
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl PageScanExecutor {
    /// 创建新的单页扫描执行器
    pub fn new(sessions: Arc<SessionPool>, analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self {
            sessions,
            analyzers,
        }
    }

    /// 根据扫描配置筛选启用的分析器
    ///
    /// 配置列表为空时启用全部
    fn enabled_analyzers(&self, scanners: &[String]) -> Vec<&Arc<dyn Analyzer>> {
        if scanners.is_empty() {
            return self.analyzers.iter().collect();
        }
        self.analyzers
            .iter()
            .filter(|a| scanners.iter().any(|s| s == a.name()))
            .collect()
    }

    /// 在单分析器超时约束下运行全部启用的分析器
    ///
    /// 返回归并后的检测结果与各分析器的失败记录
    async fn run_analyzers(
        &self,
        enabled: &[&Arc<dyn Analyzer>],
        page: &Page,
    ) -> (Vec<RawFinding>, Vec<String>) {
        let mut findings = Vec::new();
        let mut failures = Vec::new();
        for analyzer in enabled {
            let result = match tokio::time::timeout(ANALYZER_TIMEOUT, analyzer.analyze(page)).await
            {
                Ok(result) => result,
                Err(_) => Err(AnalyzerError::Timeout(analyzer.name().to_string())),
            };
            match result {
                Ok(mut batch) => {
                    debug!(
                        analyzer = analyzer.name(),
                        url = %page.url,
                        findings = batch.len(),
                        "Analyzer finished"
                    );
                    findings.append(&mut batch);
                }
                Err(e) => {
                    // 单个分析器失败不放弃该页，其余分析器继续
                    warn!(analyzer = analyzer.name(), url = %page.url, "Analyzer failed: {}", e);
                    failures.push(format!("{}: {}", analyzer.name(), e));
                }
            }
        }
        (findings, failures)
    }
}

#[async_trait]
impl JobExecutor for PageScanExecutor {
    async fn execute(&self, job: &Job) -> Result<Option<serde_json::Value>, JobError> {
        let payload: PageScanPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::ExecutionFailed(format!("Invalid page scan payload: {}", e)))?;

        let started = Instant::now();
        let session = self.sessions.acquire().await;
        let page = session
            .fetch(&payload.url)
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        let enabled = self.enabled_analyzers(&payload.config.scanners);
        if enabled.is_empty() {
            return Err(JobError::ExecutionFailed(format!(
                "No analyzer enabled for scanners {:?}",
                payload.config.scanners
            )));
        }

        let (findings, failures) = self.run_analyzers(&enabled, &page).await;

        // 全部分析器都失败时该页视为失败
        if failures.len() == enabled.len() {
            return Err(JobError::ExecutionFailed(failures.join("; ")));
        }

        let outcome = PageScanOutcome {
            url: payload.url,
            findings,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        let value = serde_json::to_value(&outcome)
            .map_err(|e| JobError::ExecutionFailed(format!("Serialize outcome: {}", e)))?;
        Ok(Some(value))
    }
}

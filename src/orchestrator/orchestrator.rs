// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::crawler::Crawler;
use crate::domain::models::crawl::{CrawlRequest, CrawlTarget};
use crate::domain::models::finding::RawFinding;
use crate::domain::models::job::{Job, JobStatus, JobType};
use crate::domain::models::scan::{
    PageScanPayload, Scan, ScanConfig, ScanJobPayload, ScanProgress, ScanStatus, ScannedPage,
};
use crate::domain::repositories::scan_repository::ScanRepository;
use crate::domain::services::aggregation_service::AggregationService;
use crate::domain::services::scoring_service::ScoringService;
use crate::orchestrator::progress::{spawn_progress_save, ProgressTracker, ScanEventSink};
use crate::queue::JobQueue;
use crate::utils::errors::{JobError, OrchestratorError};
use crate::workers::executor::{JobExecutor, PageScanOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 编排任务的入队优先级，始终高于单页扫描任务
const ORCHESTRATION_PRIORITY: i32 = 10;

/// 编排器配置
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 同时在途的单页扫描任务数上限
    pub scan_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan_concurrency: 4,
        }
    }
}

/// 进行中扫描的控制句柄
struct ActiveScan {
    /// 取消标志，扫描主循环在每页完成后检查
    cancel: Arc<AtomicBool>,
    /// 对应的编排任务ID
    job_id: Uuid,
}

/// 扫描编排器
///
/// 驱动单次扫描的完整生命周期：
/// Queued → Crawling → Scanning → Completed/Failed/Cancelled。
/// 状态只向前推进；每次转换和每页完成都会持久化。
///
/// 编排任务本身占用一个工作器，运行期间等待单页扫描任务
/// 完成，因此工作器池至少需要两个工作器。
pub struct ScanOrchestrator {
    /// 任务队列
    queue: Arc<JobQueue>,
    /// 页面发现爬虫
    crawler: Arc<Crawler>,
    /// 持久化仓库
    repository: Arc<dyn ScanRepository>,
    /// 编排器配置
    config: OrchestratorConfig,
    /// 进行中扫描的控制句柄表
    active: DashMap<Uuid, ActiveScan>,
    /// 扫描事件接收器，状态转换和页面完成时即发即忘派发
    sinks: Vec<Arc<dyn ScanEventSink>>,
}

impl ScanOrchestrator {
    /// 创建新的扫描编排器
    ///
    /// # 参数
    ///
    /// * `queue` - 任务队列
    /// * `crawler` - 页面发现爬虫
    /// * `repository` - 持久化仓库
    /// * `config` - 编排器配置
    pub fn new(
        queue: Arc<JobQueue>,
        crawler: Arc<Crawler>,
        repository: Arc<dyn ScanRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            queue,
            crawler,
            repository,
            config,
            active: DashMap::new(),
            sinks: Vec::new(),
        }
    }

    /// 注册一个扫描事件接收器
    pub fn with_sink(mut self, sink: Arc<dyn ScanEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// 向所有接收器派发状态变更，不等待处理完成
    fn notify_status(&self, scan_id: Uuid, status: ScanStatus) {
        for sink in &self.sinks {
            let sink = sink.clone();
            tokio::spawn(async move { sink.on_status_change(scan_id, status).await });
        }
    }

    /// 向所有接收器派发进度推进，不等待处理完成
    fn notify_progress(&self, scan_id: Uuid, progress: &ScanProgress) {
        for sink in &self.sinks {
            let sink = sink.clone();
            let progress = progress.clone();
            tokio::spawn(async move { sink.on_progress(scan_id, progress).await });
        }
    }

    /// 推进扫描状态并立即持久化，随后派发状态变更事件
    async fn transition(
        &self,
        scan: &mut Scan,
        next: ScanStatus,
    ) -> Result<(), OrchestratorError> {
        let from = scan.status;
        scan.transition_to(next)
            .map_err(|_| OrchestratorError::InvalidTransition {
                from: from.to_string(),
                to: next.to_string(),
            })?;
        self.repository
            .save_scan_status(scan.id, next, scan.error.clone())
            .await?;
        self.notify_status(scan.id, next);
        Ok(())
    }

    /// 提交一次新扫描
    ///
    /// 创建Queued状态的扫描聚合根并入队一个编排任务。
    /// 编排任务不重试：失败原因记录在扫描聚合根上。
    ///
    /// # 返回值
    ///
    /// * `Ok(Scan)` - 已提交的扫描
    /// * `Err(OrchestratorError)` - 持久化或入队失败
    pub async fn submit(
        &self,
        project_id: Uuid,
        base_url: &str,
        config: ScanConfig,
    ) -> Result<Scan, OrchestratorError> {
        let scan = Scan::new(project_id, base_url, config.clone());
        self.repository.save_scan(&scan).await?;

        let payload = ScanJobPayload {
            scan_id: scan.id,
            project_id,
            base_url: base_url.to_string(),
            config,
        };
        let job = Job::new(
            JobType::ScanOrchestration,
            ORCHESTRATION_PRIORITY,
            serde_json::to_value(&payload)?,
        )
        .with_max_retries(0);
        let job_id = self.queue.enqueue(job)?;

        self.active.insert(
            scan.id,
            ActiveScan {
                cancel: Arc::new(AtomicBool::new(false)),
                job_id,
            },
        );
        self.notify_status(scan.id, ScanStatus::Queued);
        info!(scan_id = %scan.id, url = %scan.base_url, "Scan submitted");
        Ok(scan)
    }

    /// 执行一次扫描
    ///
    /// 由编排任务执行器调用，也可由嵌入方直接调用以绕过队列。
    /// 编排级失败会把扫描推进到Failed并记录原因。
    #[instrument(skip(self, payload), fields(scan_id = %payload.scan_id))]
    pub async fn execute(&self, payload: &ScanJobPayload) -> Result<(), OrchestratorError> {
        let mut scan = self.repository.get_scan_by_id(payload.scan_id).await?;

        // 排队期间被取消的扫描直接丢弃
        if scan.status == ScanStatus::Cancelled {
            self.active.remove(&scan.id);
            return Err(OrchestratorError::Cancelled(scan.id));
        }

        let cancel = self
            .active
            .get(&scan.id)
            .map(|a| a.cancel.clone())
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        let result = self.run_pipeline(&mut scan, cancel).await;
        self.active.remove(&scan.id);

        if let Err(e) = result {
            if matches!(e, OrchestratorError::Cancelled(_)) {
                return Err(e);
            }
            warn!(scan_id = %scan.id, "Scan failed: {}", e);
            scan.error = Some(e.to_string());
            if scan.status.can_transition_to(ScanStatus::Failed) {
                let _ = scan.transition_to(ScanStatus::Failed);
            }
            self.repository.save_scan(&scan).await?;
            self.notify_status(scan.id, scan.status);
            return Err(e);
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        scan: &mut Scan,
        cancel: Arc<AtomicBool>,
    ) -> Result<(), OrchestratorError> {
        self.transition(scan, ScanStatus::Crawling).await?;

        let request = CrawlRequest {
            start_url: scan.base_url.clone(),
            max_depth: scan.config.max_depth,
            max_pages: scan.config.max_pages,
            include_patterns: scan.config.include_patterns.clone(),
            exclude_patterns: scan.config.exclude_patterns.clone(),
            respect_robots: scan.config.respect_robots,
            scan_type: scan.config.scan_type,
        };
        let targets = self.crawler.discover(&request).await?;
        if targets.is_empty() {
            return Err(OrchestratorError::NoPagesFound(scan.base_url.clone()));
        }
        info!(scan_id = %scan.id, pages = targets.len(), "Crawl finished");

        let mut tracker = ProgressTracker::new(targets.len());
        scan.progress = tracker.snapshot();
        spawn_progress_save(self.repository.clone(), scan.id, scan.progress.clone());

        self.transition(scan, ScanStatus::Scanning).await?;

        let scan_id = scan.id;
        let config = scan.config.clone();
        // 本次扫描入队的单页任务ID，取消时用于撤回未被认领的任务
        let page_jobs: Mutex<Vec<Uuid>> = Mutex::new(Vec::new());
        let mut results = stream::iter(
            targets
                .into_iter()
                .map(|target| self.scan_page(scan_id, target, config.clone(), &page_jobs)),
        )
        .buffer_unordered(self.config.scan_concurrency);

        let mut pages: Vec<ScannedPage> = Vec::new();
        let mut findings: Vec<RawFinding> = Vec::new();
        let mut was_cancelled = false;

        while let Some((page, mut page_findings)) = results.next().await {
            tracker.record_page(&page.url, page.duration_ms);
            findings.append(&mut page_findings);
            pages.push(page);

            scan.progress = tracker.snapshot();
            spawn_progress_save(self.repository.clone(), scan.id, scan.progress.clone());
            self.notify_progress(scan.id, &scan.progress);

            if cancel.load(Ordering::SeqCst) {
                was_cancelled = true;
                break;
            }
        }
        drop(results);

        if was_cancelled {
            // 已入队但尚未被认领的单页任务随取消一并撤回
            let remaining: Vec<Uuid> = page_jobs.lock().drain(..).collect();
            for job_id in remaining {
                self.queue.cancel(job_id);
            }
            self.transition(scan, ScanStatus::Cancelled).await?;
            self.repository.save_pages(scan.id, &pages).await?;
            self.queue.purge_terminal();
            return Err(OrchestratorError::Cancelled(scan.id));
        }

        let issues = AggregationService::aggregate(findings);
        let summary = AggregationService::summarize(&issues);
        let score = ScoringService::score(&issues, scan.config.wcag_level);
        info!(
            scan_id = %scan.id,
            pages = pages.len(),
            issues = issues.len(),
            score = score.overall,
            tier = %score.tier,
            "Scan finished"
        );

        self.repository.save_pages(scan.id, &pages).await?;
        self.repository.save_issues(scan.id, &issues).await?;

        scan.summary = Some(summary);
        scan.score = Some(score);
        self.transition(scan, ScanStatus::Completed).await?;
        self.repository.save_scan(scan).await?;
        // 本次扫描的单页任务已全部终态，连同历史终态任务一并清除
        self.queue.purge_terminal();
        Ok(())
    }

    /// 扫描单个页面
    ///
    /// 入队一个单页扫描任务并等待其终态。任何失败都只标记
    /// 该页并贡献零缺陷，不中断整个扫描。浅层页面优先调度。
    async fn scan_page(
        &self,
        scan_id: Uuid,
        target: CrawlTarget,
        config: ScanConfig,
        page_jobs: &Mutex<Vec<Uuid>>,
    ) -> (ScannedPage, Vec<RawFinding>) {
        let failed = |target: &CrawlTarget, reason: String| ScannedPage {
            url: target.url.clone(),
            depth: target.depth,
            finding_count: 0,
            duration_ms: 0,
            error: Some(reason),
        };

        let payload = PageScanPayload {
            scan_id,
            url: target.url.clone(),
            depth: target.depth,
            config,
        };
        let value = match serde_json::to_value(&payload) {
            Ok(v) => v,
            Err(e) => return (failed(&target, e.to_string()), Vec::new()),
        };

        let job = Job::new(JobType::PageScan, -(target.depth as i32), value);
        let job_id = match self.queue.enqueue(job) {
            Ok(id) => id,
            Err(e) => {
                warn!(url = %target.url, "Page scan job rejected: {}", e);
                return (failed(&target, e.to_string()), Vec::new());
            }
        };
        page_jobs.lock().push(job_id);

        let job = match self.queue.wait_for_terminal(job_id).await {
            Ok(job) => job,
            Err(e) => return (failed(&target, e.to_string()), Vec::new()),
        };

        match job.status {
            JobStatus::Completed => {
                let outcome = job
                    .result
                    .and_then(|v| serde_json::from_value::<PageScanOutcome>(v).ok());
                match outcome {
                    Some(outcome) => (
                        ScannedPage {
                            url: target.url.clone(),
                            depth: target.depth,
                            finding_count: outcome.findings.len(),
                            duration_ms: outcome.duration_ms,
                            error: None,
                        },
                        outcome.findings,
                    ),
                    None => (
                        failed(&target, "Page scan job completed without outcome".into()),
                        Vec::new(),
                    ),
                }
            }
            status => {
                let reason = job
                    .error
                    .unwrap_or_else(|| format!("Page scan job ended as {}", status));
                (failed(&target, reason), Vec::new())
            }
        }
    }

    /// 取消一次扫描
    ///
    /// 仅允许从Queued或Scanning取消。排队中的扫描立即终止并
    /// 撤回其编排任务；扫描中的扫描在当前页完成后停止。
    pub async fn cancel(&self, scan_id: Uuid) -> Result<(), OrchestratorError> {
        let mut scan = self.repository.get_scan_by_id(scan_id).await?;
        match scan.status {
            ScanStatus::Queued => {
                if let Some(active) = self.active.get(&scan_id) {
                    self.queue.cancel(active.job_id);
                }
                scan.transition_to(ScanStatus::Cancelled).map_err(|_| {
                    OrchestratorError::InvalidTransition {
                        from: ScanStatus::Queued.to_string(),
                        to: ScanStatus::Cancelled.to_string(),
                    }
                })?;
                self.repository.save_scan(&scan).await?;
                self.active.remove(&scan_id);
                self.notify_status(scan_id, ScanStatus::Cancelled);
                info!(scan_id = %scan_id, "Queued scan cancelled");
                Ok(())
            }
            ScanStatus::Scanning => match self.active.get(&scan_id) {
                Some(active) => {
                    active.cancel.store(true, Ordering::SeqCst);
                    info!(scan_id = %scan_id, "Cancellation requested");
                    Ok(())
                }
                None => Err(OrchestratorError::InvalidTransition {
                    from: scan.status.to_string(),
                    to: ScanStatus::Cancelled.to_string(),
                }),
            },
            other => Err(OrchestratorError::InvalidTransition {
                from: other.to_string(),
                to: ScanStatus::Cancelled.to_string(),
            }),
        }
    }
}

/// 编排任务执行器
///
/// 工作器池对ScanOrchestration任务的入口。取消不算失败，
/// 其余编排错误作为任务失败上报（编排任务不重试）。
pub struct ScanOrchestrationExecutor {
    orchestrator: Arc<ScanOrchestrator>,
}

impl ScanOrchestrationExecutor {
    pub fn new(orchestrator: Arc<ScanOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl JobExecutor for ScanOrchestrationExecutor {
    async fn execute(&self, job: &Job) -> Result<Option<serde_json::Value>, JobError> {
        let payload: ScanJobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::ExecutionFailed(format!("Invalid scan payload: {}", e)))?;

        match self.orchestrator.execute(&payload).await {
            Ok(()) => Ok(Some(json!({
                "scan_id": payload.scan_id,
                "status": "completed",
            }))),
            Err(OrchestratorError::Cancelled(_)) => Ok(Some(json!({
                "scan_id": payload.scan_id,
                "status": "cancelled",
            }))),
            Err(e) => Err(JobError::ExecutionFailed(e.to_string())),
        }
    }
}

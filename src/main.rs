// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use a11yscan::analyzers::heuristic::HeuristicAnalyzer;
use a11yscan::analyzers::session::SessionPool;
use a11yscan::analyzers::traits::Analyzer;
use a11yscan::config::settings::Settings;
use a11yscan::crawler::robots::RobotsChecker;
use a11yscan::crawler::Crawler;
use a11yscan::domain::models::job::JobType;
use a11yscan::domain::models::scan::ScanConfig;
use a11yscan::domain::repositories::scan_repository::ScanRepository;
use a11yscan::infrastructure::repositories::InMemoryScanRepository;
use a11yscan::orchestrator::{OrchestratorConfig, ScanOrchestrationExecutor, ScanOrchestrator};
use a11yscan::queue::{JobQueue, QueueConfig};
use a11yscan::utils::retry_policy::RetryPolicy;
use a11yscan::utils::telemetry;
use a11yscan::workers::executor::{JobExecutor, PageScanExecutor};
use a11yscan::workers::pool::{PoolConfig, WorkerPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// 主函数
///
/// 应用程序入口点：对命令行给出的URL执行一次完整扫描并
/// 输出合规评分
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();

    let start_url = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: a11yscan <start-url>"))?;
    info!("Starting a11yscan for {}", start_url);

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Build shared components
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.sessions.fetch_timeout_secs))
        .build()?;

    let queue = JobQueue::new(QueueConfig {
        capacity: settings.queue.capacity,
        retry_policy: RetryPolicy {
            max_retries: settings.queue.max_retries,
            ..RetryPolicy::standard()
        },
    });
    let crawler = Arc::new(Crawler::new(
        client.clone(),
        Arc::new(RobotsChecker::new(client.clone())),
        settings.crawler.fetch_concurrency,
    ));
    let repository = Arc::new(InMemoryScanRepository::new());
    let sessions = SessionPool::new(
        client,
        settings.sessions.pool_size,
        Duration::from_secs(settings.sessions.fetch_timeout_secs),
    );

    let orchestrator = Arc::new(ScanOrchestrator::new(
        queue.clone(),
        crawler,
        repository.clone(),
        OrchestratorConfig {
            scan_concurrency: settings.scan.concurrency,
        },
    ));

    // 4. Start the worker pool
    let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(HeuristicAnalyzer)];
    let mut executors: HashMap<JobType, Arc<dyn JobExecutor>> = HashMap::new();
    executors.insert(
        JobType::ScanOrchestration,
        Arc::new(ScanOrchestrationExecutor::new(orchestrator.clone())),
    );
    executors.insert(
        JobType::PageScan,
        Arc::new(PageScanExecutor::new(sessions, analyzers)),
    );

    let pool = WorkerPool::new(
        queue,
        executors,
        PoolConfig {
            job_timeout: Duration::from_secs(settings.workers.job_timeout_secs),
            poll_timeout: Duration::from_millis(settings.workers.poll_timeout_ms),
            shutdown_grace: Duration::from_secs(settings.workers.shutdown_grace_secs),
        },
    );
    // 编排任务自身占用一个工作器，至少需要两个
    pool.start(settings.workers.count.max(2));

    // 5. Submit the scan and wait for it to finish
    let config = ScanConfig {
        max_depth: settings.scan.max_depth,
        max_pages: settings.scan.max_pages,
        ..ScanConfig::default()
    };
    let scan = orchestrator.submit(Uuid::new_v4(), &start_url, config).await?;

    let finished = loop {
        let current = repository.get_scan_by_id(scan.id).await?;
        if current.status.is_terminal() {
            break current;
        }
        info!(
            "Scan {}: {} ({:.0}%)",
            scan.id, current.status, current.progress.percent_complete
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
    };

    pool.stop().await;

    // 6. Report the outcome
    println!("Scan {} finished: {}", finished.id, finished.status);
    if let Some(error) = &finished.error {
        println!("Error: {}", error);
    }
    if let Some(summary) = &finished.summary {
        println!(
            "Pages scanned: {}, issues: {} ({} instances)",
            finished.progress.pages_scanned, summary.total_issues, summary.total_instances
        );
    }
    if let Some(score) = &finished.score {
        println!("Compliance score: {:.1} ({})", score.overall, score.tier);
        for (principle, value) in &score.by_principle {
            println!("  {}: {:.1}", principle, value);
        }
    }
    Ok(())
}

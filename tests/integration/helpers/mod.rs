// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use a11yscan::analyzers::heuristic::HeuristicAnalyzer;
use a11yscan::analyzers::session::SessionPool;
use a11yscan::analyzers::traits::Analyzer;
use a11yscan::crawler::robots::RobotsChecker;
use a11yscan::crawler::Crawler;
use a11yscan::domain::models::job::JobType;
use a11yscan::domain::models::scan::Scan;
use a11yscan::domain::repositories::scan_repository::ScanRepository;
use a11yscan::infrastructure::repositories::InMemoryScanRepository;
use a11yscan::orchestrator::{OrchestratorConfig, ScanOrchestrationExecutor, ScanOrchestrator};
use a11yscan::queue::{JobQueue, QueueConfig};
use a11yscan::utils::retry_policy::RetryPolicy;
use a11yscan::workers::executor::{JobExecutor, PageScanExecutor};
use a11yscan::workers::pool::{PoolConfig, WorkerPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 组装好的完整扫描应用
#[allow(dead_code)]
pub struct TestApp {
    pub queue: Arc<JobQueue>,
    pub pool: WorkerPool,
    pub orchestrator: Arc<ScanOrchestrator>,
    pub repository: Arc<InMemoryScanRepository>,
}

/// 构建并启动一套完整的扫描组件
///
/// 重试退避压缩到毫秒级，保证测试快速收敛
pub async fn spawn_app(workers: usize, scan_concurrency: usize) -> TestApp {
    let client = reqwest::Client::new();
    let queue = JobQueue::new(QueueConfig {
        capacity: 200,
        retry_policy: RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(200),
            enable_jitter: false,
            ..RetryPolicy::standard()
        },
    });
    let crawler = Arc::new(Crawler::new(
        client.clone(),
        Arc::new(RobotsChecker::new(client.clone())),
        4,
    ));
    let repository = Arc::new(InMemoryScanRepository::new());
    let sessions = SessionPool::new(client, 4, Duration::from_secs(5));

    let orchestrator = Arc::new(ScanOrchestrator::new(
        queue.clone(),
        crawler,
        repository.clone(),
        OrchestratorConfig { scan_concurrency },
    ));

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
        queue.clone(),
        executors,
        PoolConfig {
            job_timeout: Duration::from_secs(10),
            poll_timeout: Duration::from_millis(20),
            shutdown_grace: Duration::from_secs(2),
        },
    );
    pool.start(workers);

    TestApp {
        queue,
        pool,
        orchestrator,
        repository,
    }
}

/// 挂载一个HTML页面
///
/// set_body_raw同时设定正文与content-type，普通的
/// set_body_string会把content-type覆盖成text/plain
pub async fn mount_html(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// 挂载一个延迟响应的HTML页面
#[allow(dead_code)]
pub async fn mount_slow_html(server: &MockServer, url_path: &str, html: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html.to_string(), "text/html; charset=utf-8")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// 轮询仓库直到扫描进入终态
pub async fn wait_for_scan(
    repository: &Arc<InMemoryScanRepository>,
    scan_id: Uuid,
    timeout: Duration,
) -> Scan {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let scan = repository
            .get_scan_by_id(scan_id)
            .await
            .expect("scan must exist");
        if scan.status.is_terminal() {
            return scan;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("scan {} still {} after {:?}", scan_id, scan.status, timeout);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

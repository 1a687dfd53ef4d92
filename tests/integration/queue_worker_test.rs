// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use a11yscan::domain::models::job::{Job, JobStatus, JobType};
use a11yscan::queue::{JobQueue, QueueConfig};
use a11yscan::utils::errors::JobError;
use a11yscan::utils::retry_policy::RetryPolicy;
use a11yscan::workers::executor::JobExecutor;
use a11yscan::workers::pool::{PoolConfig, WorkerPool};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 记录执行次数与顺序的测试执行器
struct RecordingExecutor {
    executed: Arc<AtomicUsize>,
    order: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl JobExecutor for RecordingExecutor {
    async fn execute(&self, job: &Job) -> Result<Option<serde_json::Value>, JobError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        if let Some(tag) = job.payload.get("tag").and_then(|v| v.as_i64()) {
            self.order.lock().push(tag);
        }
        Ok(Some(json!({"ok": true})))
    }
}

fn build_pool(
    queue: Arc<JobQueue>,
    executed: Arc<AtomicUsize>,
    order: Arc<Mutex<Vec<i64>>>,
) -> WorkerPool {
    let mut executors: HashMap<JobType, Arc<dyn JobExecutor>> = HashMap::new();
    executors.insert(
        JobType::PageScan,
        Arc::new(RecordingExecutor { executed, order }),
    );
    WorkerPool::new(
        queue,
        executors,
        PoolConfig {
            job_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_millis(20),
            shutdown_grace: Duration::from_secs(2),
        },
    )
}

fn quick_queue() -> Arc<JobQueue> {
    JobQueue::new(QueueConfig {
        capacity: 100,
        retry_policy: RetryPolicy {
            max_retries: 0,
            enable_jitter: false,
            ..RetryPolicy::standard()
        },
    })
}

#[tokio::test]
async fn test_many_jobs_processed_exactly_once() {
    let queue = quick_queue();
    let executed = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));
    let pool = build_pool(queue.clone(), executed.clone(), order);

    let mut ids = Vec::new();
    for i in 0..30 {
        let job = Job::new(JobType::PageScan, 0, json!({"tag": i}));
        ids.push(queue.enqueue(job).unwrap());
    }
    pool.start(4);

    for id in ids {
        let job = queue.wait_for_terminal(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }
    assert_eq!(executed.load(Ordering::SeqCst), 30);
    assert_eq!(queue.pending_len(), 0);
    pool.stop().await;
}

#[tokio::test]
async fn test_single_worker_drains_by_priority() {
    let queue = quick_queue();
    let executed = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));
    let pool = build_pool(queue.clone(), executed, order.clone());

    // 入队后再启动工作器，保证全部任务参与排序
    let mut ids = Vec::new();
    for (tag, priority) in [(1i64, 0), (2, 10), (3, 5), (4, 10)] {
        let job = Job::new(JobType::PageScan, priority, json!({"tag": tag}));
        ids.push(queue.enqueue(job).unwrap());
    }
    pool.start(1);

    for id in ids {
        queue.wait_for_terminal(id).await.unwrap();
    }
    pool.stop().await;

    // 高优先级先执行，同优先级按入队顺序
    assert_eq!(*order.lock(), vec![2, 4, 3, 1]);
}

#[tokio::test]
async fn test_job_completion_carries_result_payload() {
    let queue = quick_queue();
    let executed = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));
    let pool = build_pool(queue.clone(), executed, order);
    pool.start(1);

    let id = queue
        .enqueue(Job::new(JobType::PageScan, 0, json!({"tag": 7})))
        .unwrap();
    let job = queue.wait_for_terminal(id).await.unwrap();
    pool.stop().await;

    assert_eq!(job.result, Some(json!({"ok": true})));
    assert!(job.completed_at.is_some());
}

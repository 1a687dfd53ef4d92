// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobType;
use crate::queue::JobQueue;
use crate::workers::executor::JobExecutor;
use crate::workers::worker::{Worker, WorkerState};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// 工作器池配置
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// 单任务硬超时
    pub job_timeout: Duration,
    /// 出队轮询超时（决定Stop的响应速度）
    pub poll_timeout: Duration,
    /// 优雅关停宽限期，超过后强制中止剩余任务
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(60),
            poll_timeout: Duration::from_millis(200),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// 池健康状态
///
/// 活跃工作器不足配置半数时降级，为零时不健康
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// 单个工作器的状态快照
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    /// 工作器ID
    pub id: Uuid,
    /// 当前状态
    pub state: WorkerState,
}

/// 池状态快照
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// 配置的工作器数
    pub configured: usize,
    /// 活跃（未退出）工作器数
    pub active: usize,
    /// 执行任务中的工作器数
    pub busy: usize,
    /// 空闲工作器数
    pub idle: usize,
    /// 各工作器状态
    pub workers: Vec<WorkerSnapshot>,
}

/// 工作器句柄
struct WorkerHandle {
    id: Uuid,
    shutdown_tx: watch::Sender<bool>,
    state: Arc<RwLock<WorkerState>>,
    join: JoinHandle<()>,
}

/// 工作器池
///
/// 固定数量、可运行时伸缩的一组独立工作器。由持有它的
/// 编排器显式构造并传递引用，不使用进程级全局单例。
pub struct WorkerPool {
    /// 共享任务队列
    queue: Arc<JobQueue>,
    /// 按任务类型注册的执行器
    executors: Arc<HashMap<JobType, Arc<dyn JobExecutor>>>,
    /// 池配置
    config: PoolConfig,
    /// 工作器句柄
    workers: Mutex<Vec<WorkerHandle>>,
    /// 配置的工作器数（健康判断基准）
    configured: AtomicUsize,
}

impl WorkerPool {
    /// 创建新的工作器池
    ///
    /// # 参数
    ///
    /// * `queue` - 共享任务队列
    /// * `executors` - 按任务类型注册的执行器
    /// * `config` - 池配置
    pub fn new(
        queue: Arc<JobQueue>,
        executors: HashMap<JobType, Arc<dyn JobExecutor>>,
        config: PoolConfig,
    ) -> Self {
        Self {
            queue,
            executors: Arc::new(executors),
            config,
            workers: Mutex::new(Vec::new()),
            configured: AtomicUsize::new(0),
        }
    }

    /// 启动指定数量的工作器
    pub fn start(&self, worker_count: usize) {
        self.configured.store(worker_count, Ordering::SeqCst);
        let mut workers = self.workers.lock();
        for _ in 0..worker_count {
            workers.push(self.spawn_worker());
        }
        info!("Worker pool started with {} workers", worker_count);
    }

    fn spawn_worker(&self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(RwLock::new(WorkerState::Idle));
        let worker = Worker::new(
            self.queue.clone(),
            self.executors.clone(),
            self.config.job_timeout,
            self.config.poll_timeout,
            state.clone(),
            shutdown_rx,
        );
        let id = worker.id();
        let join = tokio::spawn(worker.run());
        WorkerHandle {
            id,
            shutdown_tx,
            state,
            join,
        }
    }

    /// 运行时调整工作器数量
    ///
    /// 扩容时新增工作器；缩容时向多余的工作器发送关停信号，
    /// 它们完成手头任务后自行退出，不丢弃进行中的工作。
    pub fn scale(&self, new_count: usize) {
        let previous = self.configured.swap(new_count, Ordering::SeqCst);
        let mut workers = self.workers.lock();

        if new_count > workers.len() {
            let to_add = new_count - workers.len();
            for _ in 0..to_add {
                workers.push(self.spawn_worker());
            }
        } else {
            while workers.len() > new_count {
                if let Some(handle) = workers.pop() {
                    let _ = handle.shutdown_tx.send(true);
                    // 任务在途时让工作器自然退出，不等待
                }
            }
        }
        info!("Worker pool scaled from {} to {}", previous, new_count);
    }

    /// 优雅关停
    ///
    /// 向所有工作器发送关停信号，等待在途任务完成，超过
    /// 宽限期后强制中止。
    pub async fn stop(&self) {
        let handles: Vec<WorkerHandle> = {
            let mut workers = self.workers.lock();
            workers.drain(..).collect()
        };
        self.configured.store(0, Ordering::SeqCst);

        for handle in &handles {
            let _ = handle.shutdown_tx.send(true);
        }

        for handle in handles {
            let abort = handle.join.abort_handle();
            match tokio::time::timeout(self.config.shutdown_grace, handle.join).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("Worker {} did not stop within grace period, aborting", handle.id);
                    abort.abort();
                }
            }
        }
        info!("Worker pool stopped");
    }

    /// 池状态快照
    pub fn status(&self) -> PoolStatus {
        let workers = self.workers.lock();
        let snapshots: Vec<WorkerSnapshot> = workers
            .iter()
            .map(|h| WorkerSnapshot {
                id: h.id,
                state: *h.state.read(),
            })
            .collect();

        let active = workers.iter().filter(|h| !h.join.is_finished()).count();
        let busy = snapshots
            .iter()
            .filter(|s| matches!(s.state, WorkerState::Busy(_)))
            .count();

        PoolStatus {
            configured: self.configured.load(Ordering::SeqCst),
            active,
            busy,
            idle: active.saturating_sub(busy),
            workers: snapshots,
        }
    }

    /// 池健康状态
    pub fn health(&self) -> PoolHealth {
        let status = self.status();
        let configured = status.configured.max(1);
        if status.active == 0 {
            PoolHealth::Unhealthy
        } else if status.active * 2 < configured {
            PoolHealth::Degraded
        } else {
            PoolHealth::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::Job;
    use crate::utils::errors::JobError;
    use crate::utils::retry_policy::RetryPolicy;
    use crate::queue::QueueConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    /// 记录执行次数的测试执行器
    struct CountingExecutor {
        executed: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl JobExecutor for CountingExecutor {
        async fn execute(&self, _job: &Job) -> Result<Option<serde_json::Value>, JobError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(JobError::ExecutionFailed("intentional".into()))
            } else {
                Ok(Some(json!({"done": true})))
            }
        }
    }

    fn pool_with_executor(
        queue: Arc<JobQueue>,
        executed: Arc<AtomicUsize>,
        fail: bool,
    ) -> WorkerPool {
        let mut executors: HashMap<JobType, Arc<dyn JobExecutor>> = HashMap::new();
        executors.insert(
            JobType::PageScan,
            Arc::new(CountingExecutor { executed, fail }),
        );
        WorkerPool::new(
            queue,
            executors,
            PoolConfig {
                job_timeout: Duration::from_secs(5),
                poll_timeout: Duration::from_millis(20),
                shutdown_grace: Duration::from_secs(1),
            },
        )
    }

    fn test_queue() -> Arc<JobQueue> {
        let mut policy = RetryPolicy::standard();
        policy.enable_jitter = false;
        JobQueue::new(QueueConfig {
            capacity: 100,
            retry_policy: policy,
        })
    }

    #[tokio::test]
    async fn test_pool_processes_jobs() {
        let queue = test_queue();
        let executed = Arc::new(AtomicUsize::new(0));
        let pool = pool_with_executor(queue.clone(), executed.clone(), false);

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(queue.enqueue(Job::new(JobType::PageScan, 0, json!({}))).unwrap());
        }
        pool.start(2);

        for id in ids {
            let job = queue.wait_for_terminal(id).await.unwrap();
            assert_eq!(job.status, crate::domain::models::job::JobStatus::Completed);
        }
        assert_eq!(executed.load(Ordering::SeqCst), 5);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_pool_status_and_health() {
        let queue = test_queue();
        let pool = pool_with_executor(queue.clone(), Arc::new(AtomicUsize::new(0)), false);

        assert_eq!(pool.health(), PoolHealth::Unhealthy);

        pool.start(4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = pool.status();
        assert_eq!(status.configured, 4);
        assert_eq!(status.active, 4);
        assert_eq!(pool.health(), PoolHealth::Healthy);

        pool.stop().await;
        assert_eq!(pool.health(), PoolHealth::Unhealthy);
    }

    #[tokio::test]
    async fn test_scale_up_and_down() {
        let queue = test_queue();
        let pool = pool_with_executor(queue.clone(), Arc::new(AtomicUsize::new(0)), false);

        pool.start(2);
        pool.scale(4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.status().active, 4);

        pool.scale(1);
        // 被缩容的工作器在下一次轮询时退出
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = pool.status();
        assert_eq!(status.configured, 1);
        assert_eq!(status.workers.len(), 1);

        pool.stop().await;
    }

    #[tokio::test]
    async fn test_failed_job_retried_then_terminal() {
        let queue = test_queue();
        let executed = Arc::new(AtomicUsize::new(0));
        let pool = pool_with_executor(queue.clone(), executed.clone(), true);

        let id = queue
            .enqueue(Job::new(JobType::PageScan, 0, json!({})).with_max_retries(0))
            .unwrap();
        pool.start(1);

        let job = queue.wait_for_terminal(id).await.unwrap();
        assert_eq!(job.status, crate::domain::models::job::JobStatus::Failed);
        assert_eq!(executed.load(Ordering::SeqCst), 1);

        pool.stop().await;
    }
}

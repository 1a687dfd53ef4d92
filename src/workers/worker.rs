// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobType;
use crate::queue::JobQueue;
use crate::utils::errors::JobError;
use crate::workers::executor::JobExecutor;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// 工作器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// 空闲，轮询队列中
    Idle,
    /// 执行任务中
    Busy(Uuid),
    /// 已退出
    Stopped,
}

/// 工作器
///
/// 每个工作器运行独立循环：先尝试取高优先级的编排任务，
/// 再取单页扫描任务，两次尝试之间使用短轮询超时，保证
/// Stop()能及时打断。取到任务后在硬超时内执行，超时或
/// 出错时向队列上报失败（触发重试/退避），成功时上报完成。
pub struct Worker {
    /// 工作器ID
    id: Uuid,
    /// 任务队列
    queue: Arc<JobQueue>,
    /// 按任务类型注册的执行器
    executors: Arc<HashMap<JobType, Arc<dyn JobExecutor>>>,
    /// 单任务硬超时
    job_timeout: Duration,
    /// 出队轮询超时
    poll_timeout: Duration,
    /// 当前状态（池通过共享引用读取）
    state: Arc<RwLock<WorkerState>>,
    /// 关停信号
    shutdown: watch::Receiver<bool>,
}

/// 工作器按固定顺序尝试的任务类型：编排任务优先于单页扫描
const DEQUEUE_ORDER: [JobType; 2] = [JobType::ScanOrchestration, JobType::PageScan];

impl Worker {
    pub fn new(
        queue: Arc<JobQueue>,
        executors: Arc<HashMap<JobType, Arc<dyn JobExecutor>>>,
        job_timeout: Duration,
        poll_timeout: Duration,
        state: Arc<RwLock<WorkerState>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue,
            executors,
            job_timeout,
            poll_timeout,
            state,
            shutdown,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 运行工作器循环，直至收到关停信号
    pub async fn run(mut self) {
        info!("Worker {} started", self.id);

        'main: loop {
            if *self.shutdown.borrow() {
                break;
            }

            let mut processed = false;
            for job_type in DEQUEUE_ORDER {
                if *self.shutdown.borrow() {
                    break 'main;
                }
                if let Some(job) = self.queue.dequeue(job_type, self.id, self.poll_timeout).await
                {
                    self.process(job).await;
                    processed = true;
                    break;
                }
            }

            if !processed {
                // 两种类型都为空时小睡一下，避免空转
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_timeout) => {}
                    _ = self.shutdown.changed() => {}
                }
            }
        }

        *self.state.write() = WorkerState::Stopped;
        info!("Worker {} stopped", self.id);
    }

    #[instrument(skip(self, job), fields(worker_id = %self.id, job_id = %job.id, job_type = %job.job_type))]
    async fn process(&self, job: crate::domain::models::job::Job) {
        debug!("Processing job");
        *self.state.write() = WorkerState::Busy(job.id);

        let result = match self.executors.get(&job.job_type) {
            // 编排任务的时长由其分发的单页任务各自的超时约束，
            // 不施加统一硬超时；其余任务超过硬超时视为失败
            Some(executor) if job.job_type == JobType::ScanOrchestration => {
                executor.execute(&job).await
            }
            Some(executor) => {
                match tokio::time::timeout(self.job_timeout, executor.execute(&job)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(JobError::Timeout(self.job_timeout.as_secs())),
                }
            }
            None => Err(JobError::ExecutionFailed(format!(
                "No executor registered for job type {}",
                job.job_type
            ))),
        };

        match result {
            Ok(payload) => {
                if let Err(e) = self.queue.mark_completed(job.id, payload) {
                    error!("Failed to report job completion: {}", e);
                }
            }
            Err(job_err) => match self.queue.mark_failed(job.id, job_err.to_string()) {
                Ok(true) => debug!("Job will be retried"),
                Ok(false) => debug!("Job permanently failed"),
                Err(e) => error!("Failed to report job failure: {}", e),
            },
        }

        *self.state.write() = WorkerState::Idle;
    }
}

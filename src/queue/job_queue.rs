// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobStatus, JobType};
use crate::utils::errors::QueueError;
use crate::utils::retry_policy::RetryPolicy;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 队列配置
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 待处理任务的容量上限，入队超限时快速失败
    pub capacity: usize,
    /// 失败重试策略
    pub retry_policy: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            retry_policy: RetryPolicy::standard(),
        }
    }
}

/// 待处理堆条目
///
/// 排序：优先级高者先出队，同优先级按入队顺序（单调递增的
/// 序列号作为决胜，绝不比较对象身份）
struct PendingEntry {
    priority: i32,
    seq: u64,
    job_id: Uuid,
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingEntry {}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap是最大堆：优先级升序比较，序列号倒序比较（小序列号更大）
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// 单个任务类型的就绪队列
///
/// 退避等待中的任务不在堆内，退避到期后由延迟任务重新放入
struct Lane {
    heap: Mutex<BinaryHeap<PendingEntry>>,
    notify: Notify,
}

impl Lane {
    fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
        }
    }
}

/// 内存任务队列
///
/// 有界、线程安全、按优先级排序。任务在入队时创建并由队列
/// 独占持有，被工作器认领后由工作器持有直至上报结果。
/// 每种任务类型维护独立的就绪队列，类型之间无顺序保证。
pub struct JobQueue {
    /// 任务表，支持并发读写
    jobs: DashMap<Uuid, Job>,
    /// 扫描编排任务就绪队列
    orchestration: Lane,
    /// 单页扫描任务就绪队列
    page_scan: Lane,
    /// 每个任务的观察通道，到达终态时写入任务快照。
    /// 快照由通道自身保存，即使无人订阅也不丢失。
    watchers: DashMap<Uuid, watch::Sender<Option<Job>>>,
    /// 入队序列号（FIFO决胜）
    seq: AtomicU64,
    /// 当前待处理任务数（容量判断）
    pending_count: AtomicUsize,
    /// 队列配置
    config: QueueConfig,
}

impl JobQueue {
    /// 创建新的任务队列实例
    pub fn new(config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
            orchestration: Lane::new(),
            page_scan: Lane::new(),
            watchers: DashMap::new(),
            seq: AtomicU64::new(0),
            pending_count: AtomicUsize::new(0),
            config,
        })
    }

    fn lane(&self, job_type: JobType) -> &Lane {
        match job_type {
            JobType::ScanOrchestration => &self.orchestration,
            JobType::PageScan => &self.page_scan,
        }
    }

    /// 入队任务
    ///
    /// 队列已满时快速失败而非阻塞等待（有界背压）
    ///
    /// # 参数
    ///
    /// * `job` - 要入队的任务（状态须为Pending）
    ///
    /// # 返回值
    ///
    /// * `Ok(Uuid)` - 入队成功的任务ID
    /// * `Err(QueueError::Full)` - 队列已满
    pub fn enqueue(&self, job: Job) -> Result<Uuid, QueueError> {
        // 容量预检与计数递增必须一步完成，避免并发超卖
        let mut count = self.pending_count.load(AtomicOrdering::SeqCst);
        loop {
            if count >= self.config.capacity {
                return Err(QueueError::Full(self.config.capacity));
            }
            match self.pending_count.compare_exchange(
                count,
                count + 1,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => count = actual,
            }
        }

        let job_id = job.id;
        let job_type = job.job_type;
        let priority = job.priority;

        let (tx, _rx) = watch::channel(None);
        self.watchers.insert(job_id, tx);
        self.jobs.insert(job_id, job);
        self.push_ready(job_type, priority, job_id);

        debug!(%job_id, %job_type, priority, "Job enqueued");
        Ok(job_id)
    }

    /// 将任务放入就绪堆并唤醒一个等待的工作器
    fn push_ready(&self, job_type: JobType, priority: i32, job_id: Uuid) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::SeqCst);
        let lane = self.lane(job_type);
        lane.heap.lock().push(PendingEntry {
            priority,
            seq,
            job_id,
        });
        lane.notify.notify_one();
    }

    /// 出队任务
    ///
    /// 返回该类型中优先级最高的待处理任务，同优先级按入队顺序。
    /// 在超时时间内无任务可取时返回None。
    /// 出队即认领：任务被原子地标记为Running并绑定工作器ID，
    /// 同一个任务不会被两个工作器同时取得。
    ///
    /// # 参数
    ///
    /// * `job_type` - 任务类型
    /// * `worker_id` - 认领任务的工作器ID
    /// * `timeout` - 等待超时
    pub async fn dequeue(
        &self,
        job_type: JobType,
        worker_id: Uuid,
        timeout: Duration,
    ) -> Option<Job> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(job) = self.try_claim(job_type, worker_id) {
                return Some(job);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let wait = self.lane(job_type).notify.notified();
            tokio::pin!(wait);
            tokio::select! {
                _ = &mut wait => {}
                _ = tokio::time::sleep_until(deadline) => return None,
            }
        }
    }

    /// 尝试认领一个就绪任务
    ///
    /// 跳过堆中已取消或已失效的残留条目
    fn try_claim(&self, job_type: JobType, worker_id: Uuid) -> Option<Job> {
        let lane = self.lane(job_type);
        let mut heap = lane.heap.lock();
        while let Some(entry) = heap.pop() {
            if let Some(mut job) = self.jobs.get_mut(&entry.job_id) {
                if job.status == JobStatus::Pending && job.claim(worker_id).is_ok() {
                    self.pending_count.fetch_sub(1, AtomicOrdering::SeqCst);
                    return Some(job.clone());
                }
            }
            // Stale entry (cancelled or re-enqueued); drop and keep popping
        }
        None
    }

    /// 标记任务完成
    ///
    /// # 参数
    ///
    /// * `job_id` - 任务ID
    /// * `result` - 执行结果负载
    pub fn mark_completed(
        &self,
        job_id: Uuid,
        result: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        let snapshot = {
            let mut job = self
                .jobs
                .get_mut(&job_id)
                .ok_or(QueueError::JobNotFound(job_id))?;
            if job.status.is_terminal() {
                return Err(QueueError::TerminalState(job_id));
            }
            job.complete(result)
                .map_err(|_| QueueError::TerminalState(job_id))?;
            job.clone()
        };
        // 通知在表项锁之外发出，避免阻塞其他工作器
        self.notify_terminal(snapshot);
        debug!(%job_id, "Job completed");
        Ok(())
    }

    /// 标记任务失败
    ///
    /// 未耗尽重试时将任务重置为Pending并在指数退避
    /// （`min(2^retry_count, 60)`秒，带抖动）后重新入队；
    /// 否则任务进入终态Failed。
    ///
    /// # 参数
    ///
    /// * `job_id` - 任务ID
    /// * `error` - 失败原因
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 将会重试
    /// * `Ok(false)` - 已永久失败
    pub fn mark_failed(self: &Arc<Self>, job_id: Uuid, error: String) -> Result<bool, QueueError> {
        // 永久失败时携带终态快照，重试时携带重新入队所需信息
        let (terminal, job_type, priority, retry_count) = {
            let mut job = self
                .jobs
                .get_mut(&job_id)
                .ok_or(QueueError::JobNotFound(job_id))?;
            if job.status.is_terminal() {
                return Err(QueueError::TerminalState(job_id));
            }

            if job.can_retry() {
                job.reset_for_retry(error.clone())
                    .map_err(|_| QueueError::TerminalState(job_id))?;
                // 退避等待中的任务计入待处理数，取消和容量判断保持一致
                self.pending_count.fetch_add(1, AtomicOrdering::SeqCst);
                (None, job.job_type, job.priority, job.retry_count)
            } else {
                job.fail(error.clone())
                    .map_err(|_| QueueError::TerminalState(job_id))?;
                (Some(job.clone()), job.job_type, job.priority, job.retry_count)
            }
        };

        if let Some(snapshot) = terminal {
            self.notify_terminal(snapshot);
            warn!(%job_id, retries = retry_count, "Job permanently failed: {}", error);
            return Ok(false);
        }

        let delay = self.config.retry_policy.calculate_backoff(retry_count);
        debug!(%job_id, retry = retry_count, delay_ms = delay.as_millis() as u64,
            "Job failed, retrying after backoff: {}", error);

        // 退避期间任务不在就绪堆中；到期后重新检查状态，
        // 退避中被取消的任务在此被清除，不再回到队列
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_pending = queue
                .jobs
                .get(&job_id)
                .map(|j| j.status == JobStatus::Pending)
                .unwrap_or(false);
            if still_pending {
                queue.push_ready(job_type, priority, job_id);
            } else {
                debug!(%job_id, "Dropping retry for job no longer pending");
            }
        });

        Ok(true)
    }

    /// 取消任务
    ///
    /// 仅对尚未被认领的任务生效；执行中的任务运行至完成或超时
    ///
    /// # 返回值
    ///
    /// 取消成功返回true
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let snapshot = {
            match self.jobs.get_mut(&job_id) {
                Some(mut job) => {
                    if job.cancel().is_ok() {
                        Some(job.clone())
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        match snapshot {
            Some(job) => {
                self.pending_count.fetch_sub(1, AtomicOrdering::SeqCst);
                self.notify_terminal(job);
                info!(%job_id, "Job cancelled");
                true
            }
            None => false,
        }
    }

    /// 等待任务到达终态
    ///
    /// 任务在调用前已到终态时立即返回：终态快照保存在观察
    /// 通道内，不依赖订阅时机。
    ///
    /// # 返回值
    ///
    /// 终态下的任务快照
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> Result<Job, QueueError> {
        let mut rx = match self.watchers.get(&job_id) {
            Some(tx) => tx.subscribe(),
            // 观察通道已被清理：任务若仍在表中且已终态则直接返回
            None => {
                return self
                    .get_job(job_id)
                    .filter(|j| j.status.is_terminal())
                    .ok_or(QueueError::JobNotFound(job_id));
            }
        };

        loop {
            if let Some(job) = rx.borrow_and_update().clone() {
                return Ok(job);
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        self.get_job(job_id).ok_or(QueueError::JobNotFound(job_id))
    }

    /// 获取任务快照
    pub fn get_job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.get(&job_id).map(|j| j.clone())
    }

    /// 当前待处理任务数
    pub fn pending_len(&self) -> usize {
        self.pending_count.load(AtomicOrdering::SeqCst)
    }

    /// 清除全部终态任务及其观察通道
    ///
    /// 长期运行时由编排器在每次扫描收尾调用，任务表不随历史
    /// 任务无限增长。清除前已订阅的等待者不受影响：终态快照
    /// 已写入其通道，发送端移除后仍可读取。
    ///
    /// # 返回值
    ///
    /// 被清除的任务数
    pub fn purge_terminal(&self) -> usize {
        let terminal: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|entry| entry.status.is_terminal())
            .map(|entry| *entry.key())
            .collect();
        for job_id in &terminal {
            self.jobs.remove(job_id);
            self.watchers.remove(job_id);
        }
        if !terminal.is_empty() {
            debug!(purged = terminal.len(), "Purged terminal jobs");
        }
        terminal.len()
    }

    fn notify_terminal(&self, job: Job) {
        if let Some(tx) = self.watchers.get(&job.id) {
            // send_replace无论有无订阅者都会保存快照
            tx.send_replace(Some(job));
        }
    }
}

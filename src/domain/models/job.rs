// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 任务实体
///
/// 表示队列中一个待处理的工作单元。任务在入队时创建并由队列
/// 独占持有，被工作器认领后由该工作器持有，直至上报完成或失败。
/// 终态（Completed/Failed/Cancelled）不可再变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 任务类型，决定由哪类执行器处理
    pub job_type: JobType,
    /// 任务状态
    pub status: JobStatus,
    /// 任务优先级，数值越大优先级越高
    pub priority: i32,
    /// 任务负载数据，包含任务执行所需的参数和配置
    pub payload: serde_json::Value,
    /// 已重试次数
    pub retry_count: u32,
    /// 最大重试次数
    pub max_retries: u32,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始执行时间
    pub started_at: Option<DateTime<Utc>>,
    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 最近一次失败的错误信息
    pub error: Option<String>,
    /// 认领该任务的工作器ID
    pub assigned_worker: Option<Uuid>,
    /// 任务执行结果（完成时由工作器写回）
    pub result: Option<serde_json::Value>,
}

/// 任务类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// 扫描编排任务，驱动一次完整的网站扫描
    #[default]
    ScanOrchestration,
    /// 单页扫描任务，对一个URL执行分析器检查
    PageScan,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobType::ScanOrchestration => write!(f, "scan_orchestration"),
            JobType::PageScan => write!(f, "page_scan"),
        }
    }
}

impl FromStr for JobType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan_orchestration" => Ok(JobType::ScanOrchestration),
            "page_scan" => Ok(JobType::PageScan),
            _ => Err(()),
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Failed
/// Pending → Cancelled
/// 失败且未耗尽重试时 Running → Pending（重新入队）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 等待中，任务已入队但尚未被认领
    #[default]
    Pending,
    /// 执行中，任务已被某个工作器认领
    Running,
    /// 已完成
    Completed,
    /// 已失败，且已达到最大重试次数
    Failed,
    /// 已取消
    Cancelled,
}

impl JobStatus {
    /// 判断状态是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Job {
    /// 创建一个新的任务
    ///
    /// # 参数
    ///
    /// * `job_type` - 任务类型
    /// * `priority` - 优先级
    /// * `payload` - 任务负载数据
    ///
    /// # 返回值
    ///
    /// 返回新创建的任务实例，初始状态为Pending
    pub fn new(job_type: JobType, priority: i32, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Pending,
            priority,
            payload,
            retry_count: 0,
            max_retries: 3,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            assigned_worker: None,
            result: None,
        }
    }

    /// 设置最大重试次数
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 认领任务
    ///
    /// 将任务状态从Pending变更为Running并记录工作器ID
    pub fn claim(&mut self, worker_id: Uuid) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                self.started_at = Some(Utc::now());
                self.assigned_worker = Some(worker_id);
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成任务
    pub fn complete(&mut self, result: Option<serde_json::Value>) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.completed_at = Some(Utc::now());
                self.result = result;
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记任务永久失败
    pub fn fail(&mut self, error: String) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Running | JobStatus::Pending => {
                self.status = JobStatus::Failed;
                self.completed_at = Some(Utc::now());
                self.error = Some(error);
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 取消任务
    ///
    /// 仅允许取消尚未被认领的任务；执行中的任务会运行至完成或超时
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Cancelled;
                self.completed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 为重试重置任务
    ///
    /// 将失败的执行重置回Pending并递增重试计数
    pub fn reset_for_retry(&mut self, error: String) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Pending;
                self.retry_count += 1;
                self.error = Some(error);
                self.started_at = None;
                self.assigned_worker = None;
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 判断任务是否还能重试
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::new(JobType::PageScan, 5, json!({"url": "https://example.com"}));
        assert_eq!(job.status, JobStatus::Pending);

        let worker = Uuid::new_v4();
        job.claim(worker).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.assigned_worker, Some(worker));

        job.complete(Some(json!({"findings": []}))).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        let mut job = Job::new(JobType::PageScan, 0, json!({}));
        job.claim(Uuid::new_v4()).unwrap();
        job.complete(None).unwrap();

        assert!(job.claim(Uuid::new_v4()).is_err());
        assert!(job.fail("late".into()).is_err());
        assert!(job.cancel().is_err());
    }

    #[test]
    fn test_cancel_only_pending() {
        let mut job = Job::new(JobType::PageScan, 0, json!({}));
        let mut running = job.clone();
        running.claim(Uuid::new_v4()).unwrap();

        assert!(job.cancel().is_ok());
        assert!(running.cancel().is_err());
    }

    #[test]
    fn test_reset_for_retry_increments_count() {
        let mut job = Job::new(JobType::PageScan, 0, json!({}));
        job.claim(Uuid::new_v4()).unwrap();
        job.reset_for_retry("timeout".into()).unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
        assert!(job.assigned_worker.is_none());
        assert!(job.can_retry());
    }
}

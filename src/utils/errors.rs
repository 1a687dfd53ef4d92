// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;
use uuid::Uuid;

/// 爬虫错误类型
///
/// 单页抓取失败不是错误：爬虫记录日志并缩小结果
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// 起始URL无法解析，整个扫描致命
    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),
}

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 队列已满，入队被拒绝（有界背压）
    #[error("Queue full: capacity {0} reached")]
    Full(usize),

    /// 任务不存在
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// 任务已处于终态，不可再变更
    #[error("Job {0} is in a terminal state")]
    TerminalState(Uuid),
}

/// 分析器错误类型
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// 分析器执行超时
    #[error("Analyzer {0} timed out")]
    Timeout(String),

    /// 页面内容不可用
    #[error("Page unavailable: {0}")]
    PageUnavailable(String),
}

/// 编排器错误类型
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 爬取未发现任何页面，扫描失败
    #[error("No pages found for {0}")]
    NoPagesFound(String),

    /// 爬虫致命错误
    #[error(transparent)]
    Crawler(#[from] CrawlerError),

    /// 队列错误
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// 仓库错误
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// 无效的扫描状态转换
    #[error("Invalid scan state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// 扫描已被取消
    #[error("Scan {0} was cancelled")]
    Cancelled(Uuid),

    /// 任务负载序列化失败
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Scan not found: {0}")]
    NotFound(Uuid),
}

/// 任务执行错误类型
///
/// 工作器向队列上报失败时使用，是否重试由队列的重试
/// 策略决定。
#[derive(Error, Debug)]
pub enum JobError {
    /// 任务执行超过硬超时，触发队列的重试策略
    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    /// 任务执行抛出错误
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),
}

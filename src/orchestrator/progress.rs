// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::{ScanProgress, ScanStatus};
use crate::domain::repositories::scan_repository::ScanRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 扫描事件接收器
///
/// 编排器在每次状态转换和每页完成后以即发即忘方式派发事件，
/// 派发不阻塞扫描主循环，事件处理失败也不影响扫描本身。
/// 典型实现：webhook推送、WebSocket广播、指标上报。
#[async_trait]
pub trait ScanEventSink: Send + Sync {
    /// 扫描状态变更
    async fn on_status_change(&self, scan_id: Uuid, status: ScanStatus);

    /// 单页完成后的进度推进
    async fn on_progress(&self, scan_id: Uuid, progress: ScanProgress);
}

/// 扫描进度跟踪器
///
/// 爬取结束后以发现的页面总数初始化，每完成一页记录一次。
/// 预计剩余时间基于已完成页面的平均耗时。
pub struct ProgressTracker {
    total_pages: usize,
    pages_scanned: usize,
    cumulative_ms: u64,
    current_page: Option<String>,
}

impl ProgressTracker {
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            pages_scanned: 0,
            cumulative_ms: 0,
            current_page: None,
        }
    }

    /// 记录一个已完成页面
    pub fn record_page(&mut self, url: &str, duration_ms: u64) {
        self.pages_scanned += 1;
        self.cumulative_ms += duration_ms;
        self.current_page = Some(url.to_string());
    }

    /// 生成进度快照
    pub fn snapshot(&self) -> ScanProgress {
        let percent_complete = if self.total_pages == 0 {
            0.0
        } else {
            self.pages_scanned as f64 / self.total_pages as f64 * 100.0
        };

        let eta_seconds = if self.pages_scanned == 0 {
            None
        } else {
            let avg_ms = self.cumulative_ms / self.pages_scanned as u64;
            let remaining = (self.total_pages - self.pages_scanned) as u64;
            Some(avg_ms * remaining / 1000)
        };

        ScanProgress {
            total_pages: self.total_pages,
            pages_crawled: self.total_pages,
            pages_scanned: self.pages_scanned,
            current_page: self.current_page.clone(),
            percent_complete,
            eta_seconds,
        }
    }
}

/// 异步保存进度快照
///
/// 进度上报不阻塞扫描主循环，持久化失败只记日志
pub fn spawn_progress_save(
    repository: Arc<dyn ScanRepository>,
    scan_id: Uuid,
    progress: ScanProgress,
) {
    tokio::spawn(async move {
        if let Err(e) = repository.save_progress(scan_id, &progress).await {
            warn!(scan_id = %scan_id, "Failed to save progress: {}", e);
        }
    });
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::AggregatedIssue;
use crate::domain::models::scan::{Scan, ScanProgress, ScanStatus, ScannedPage};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 扫描仓库特质
///
/// 持久化协作方接口。核心在明确定义的时点调用：
/// 状态转换时、每页扫描后、扫描完成时。
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// 保存扫描聚合根（提交时）
    async fn save_scan(&self, scan: &Scan) -> Result<(), RepositoryError>;
    /// 更新扫描状态
    async fn save_scan_status(
        &self,
        scan_id: Uuid,
        status: ScanStatus,
        error: Option<String>,
    ) -> Result<(), RepositoryError>;
    /// 更新进度快照
    async fn save_progress(
        &self,
        scan_id: Uuid,
        progress: &ScanProgress,
    ) -> Result<(), RepositoryError>;
    /// 保存已扫描页面记录
    async fn save_pages(
        &self,
        scan_id: Uuid,
        pages: &[ScannedPage],
    ) -> Result<(), RepositoryError>;
    /// 保存聚合问题列表
    async fn save_issues(
        &self,
        scan_id: Uuid,
        issues: &[AggregatedIssue],
    ) -> Result<(), RepositoryError>;
    /// 根据ID查找扫描
    async fn get_scan_by_id(&self, scan_id: Uuid) -> Result<Scan, RepositoryError>;
}

#[async_trait]
impl<T: ScanRepository + ?Sized> ScanRepository for Arc<T> {
    async fn save_scan(&self, scan: &Scan) -> Result<(), RepositoryError> {
        (**self).save_scan(scan).await
    }

    async fn save_scan_status(
        &self,
        scan_id: Uuid,
        status: ScanStatus,
        error: Option<String>,
    ) -> Result<(), RepositoryError> {
        (**self).save_scan_status(scan_id, status, error).await
    }

    async fn save_progress(
        &self,
        scan_id: Uuid,
        progress: &ScanProgress,
    ) -> Result<(), RepositoryError> {
        (**self).save_progress(scan_id, progress).await
    }

    async fn save_pages(
        &self,
        scan_id: Uuid,
        pages: &[ScannedPage],
    ) -> Result<(), RepositoryError> {
        (**self).save_pages(scan_id, pages).await
    }

    async fn save_issues(
        &self,
        scan_id: Uuid,
        issues: &[AggregatedIssue],
    ) -> Result<(), RepositoryError> {
        (**self).save_issues(scan_id, issues).await
    }

    async fn get_scan_by_id(&self, scan_id: Uuid) -> Result<Scan, RepositoryError> {
        (**self).get_scan_by_id(scan_id).await
    }
}

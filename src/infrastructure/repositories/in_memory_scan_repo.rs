// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::issue::AggregatedIssue;
use crate::domain::models::scan::{Scan, ScanProgress, ScanStatus, ScannedPage};
use crate::domain::repositories::scan_repository::ScanRepository;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// 内存扫描仓库
///
/// 参考实现，用于嵌入式运行和测试。生产部署通过实现
/// `ScanRepository`特质接入自己的存储。
#[derive(Default)]
pub struct InMemoryScanRepository {
    scans: DashMap<Uuid, Scan>,
    pages: DashMap<Uuid, Vec<ScannedPage>>,
    issues: DashMap<Uuid, Vec<AggregatedIssue>>,
}

impl InMemoryScanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取某扫描的页面记录
    pub fn pages_for(&self, scan_id: Uuid) -> Vec<ScannedPage> {
        self.pages
            .get(&scan_id)
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// 读取某扫描的聚合问题
    pub fn issues_for(&self, scan_id: Uuid) -> Vec<AggregatedIssue> {
        self.issues
            .get(&scan_id)
            .map(|i| i.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ScanRepository for InMemoryScanRepository {
    async fn save_scan(&self, scan: &Scan) -> Result<(), RepositoryError> {
        self.scans.insert(scan.id, scan.clone());
        Ok(())
    }

    async fn save_scan_status(
        &self,
        scan_id: Uuid,
        status: ScanStatus,
        error: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut scan = self
            .scans
            .get_mut(&scan_id)
            .ok_or(RepositoryError::NotFound(scan_id))?;
        scan.status = status;
        if error.is_some() {
            scan.error = error;
        }
        Ok(())
    }

    async fn save_progress(
        &self,
        scan_id: Uuid,
        progress: &ScanProgress,
    ) -> Result<(), RepositoryError> {
        let mut scan = self
            .scans
            .get_mut(&scan_id)
            .ok_or(RepositoryError::NotFound(scan_id))?;
        scan.progress = progress.clone();
        Ok(())
    }

    async fn save_pages(
        &self,
        scan_id: Uuid,
        pages: &[ScannedPage],
    ) -> Result<(), RepositoryError> {
        self.pages.insert(scan_id, pages.to_vec());
        Ok(())
    }

    async fn save_issues(
        &self,
        scan_id: Uuid,
        issues: &[AggregatedIssue],
    ) -> Result<(), RepositoryError> {
        self.issues.insert(scan_id, issues.to_vec());
        Ok(())
    }

    async fn get_scan_by_id(&self, scan_id: Uuid) -> Result<Scan, RepositoryError> {
        self.scans
            .get(&scan_id)
            .map(|s| s.clone())
            .ok_or(RepositoryError::NotFound(scan_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::scan::ScanConfig;

    #[tokio::test]
    async fn test_save_and_get_scan() {
        let repo = InMemoryScanRepository::new();
        let scan = Scan::new(Uuid::new_v4(), "https://example.com", ScanConfig::default());
        repo.save_scan(&scan).await.unwrap();

        let loaded = repo.get_scan_by_id(scan.id).await.unwrap();
        assert_eq!(loaded.base_url, "https://example.com");
        assert_eq!(loaded.status, ScanStatus::Queued);
    }

    #[tokio::test]
    async fn test_status_update_preserves_error() {
        let repo = InMemoryScanRepository::new();
        let scan = Scan::new(Uuid::new_v4(), "https://example.com", ScanConfig::default());
        repo.save_scan(&scan).await.unwrap();

        repo.save_scan_status(scan.id, ScanStatus::Failed, Some("boom".into()))
            .await
            .unwrap();
        let loaded = repo.get_scan_by_id(scan.id).await.unwrap();
        assert_eq!(loaded.status, ScanStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_unknown_scan_is_not_found() {
        let repo = InMemoryScanRepository::new();
        let err = repo.get_scan_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pages_and_issues_roundtrip() {
        let repo = InMemoryScanRepository::new();
        let scan = Scan::new(Uuid::new_v4(), "https://example.com", ScanConfig::default());
        repo.save_scan(&scan).await.unwrap();

        let pages = vec![ScannedPage {
            url: "https://example.com/".into(),
            depth: 0,
            finding_count: 2,
            duration_ms: 120,
            error: None,
        }];
        repo.save_pages(scan.id, &pages).await.unwrap();
        assert_eq!(repo.pages_for(scan.id).len(), 1);
        assert!(repo.issues_for(scan.id).is_empty());
    }
}

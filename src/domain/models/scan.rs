// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl::ScanType;
use crate::domain::models::finding::WcagLevel;
use crate::domain::models::issue::IssueSummary;
use crate::domain::models::job::DomainError;
use crate::domain::models::score::ComplianceScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 扫描配置
///
/// 由API层提交的扫描参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 最大爬取深度
    pub max_depth: u32,
    /// 最大页面数
    pub max_pages: usize,
    /// 目标WCAG级别
    pub wcag_level: WcagLevel,
    /// 启用的分析器名称（为空时启用全部）
    pub scanners: Vec<String>,
    /// 排除模式
    pub exclude_patterns: Vec<String>,
    /// 包含模式
    pub include_patterns: Vec<String>,
    /// 是否遵循robots.txt
    pub respect_robots: bool,
    /// 是否截图（需要分析器支持，本核心仅透传）
    pub screenshot_enabled: bool,
    /// 扫描范围
    pub scan_type: ScanType,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            wcag_level: WcagLevel::AA,
            scanners: Vec::new(),
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            respect_robots: true,
            screenshot_enabled: false,
            scan_type: ScanType::FullSite,
        }
    }
}

/// 扫描进度快照
///
/// 扫描期间由编排器反复更新，对调用方只读
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    /// 发现的页面总数
    pub total_pages: usize,
    /// 已爬取页面数
    pub pages_crawled: usize,
    /// 已扫描页面数
    pub pages_scanned: usize,
    /// 当前处理的页面
    pub current_page: Option<String>,
    /// 完成百分比 (0-100)
    pub percent_complete: f64,
    /// 预计剩余秒数（基于单页平均耗时的滑动平均）
    pub eta_seconds: Option<u64>,
}

/// 单页扫描记录
///
/// 每个被尝试的页面产生一条记录，失败页面带错误标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedPage {
    /// 页面URL
    pub url: String,
    /// 发现深度
    pub depth: u32,
    /// 本页发现的缺陷数
    pub finding_count: usize,
    /// 扫描耗时（毫秒）
    pub duration_ms: u64,
    /// 错误标记，失败页面记录原因并贡献零缺陷
    pub error: Option<String>,
}

/// 扫描状态枚举
///
/// 状态只向前推进，不回退：
/// Queued → Crawling → Scanning → Completed/Failed
/// Cancelled 仅可从 Queued 或 Scanning 到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// 已提交，等待开始
    #[default]
    Queued,
    /// 爬取中，正在发现页面
    Crawling,
    /// 扫描中，正在逐页分析
    Scanning,
    /// 已完成
    Completed,
    /// 已失败（编排级错误）
    Failed,
    /// 已取消
    Cancelled,
}

impl ScanStatus {
    /// 判断状态是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Failed | ScanStatus::Cancelled
        )
    }

    /// 判断向目标状态的转换是否合法
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        use ScanStatus::*;
        matches!(
            (self, next),
            (Queued, Crawling)
                | (Crawling, Scanning)
                | (Crawling, Failed)
                | (Scanning, Completed)
                | (Scanning, Failed)
                | (Queued, Cancelled)
                | (Scanning, Cancelled)
        )
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanStatus::Queued => write!(f, "queued"),
            ScanStatus::Crawling => write!(f, "crawling"),
            ScanStatus::Scanning => write!(f, "scanning"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
            ScanStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 扫描聚合根
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    /// 扫描唯一标识符
    pub id: Uuid,
    /// 所属项目ID
    pub project_id: Uuid,
    /// 起始URL
    pub base_url: String,
    /// 扫描状态
    pub status: ScanStatus,
    /// 扫描配置
    pub config: ScanConfig,
    /// 进度快照
    pub progress: ScanProgress,
    /// 问题统计摘要（完成时写入）
    pub summary: Option<IssueSummary>,
    /// 合规评分（完成时写入）
    pub score: Option<ComplianceScore>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 编排级错误信息
    pub error: Option<String>,
}

impl Scan {
    /// 创建一个新的扫描
    pub fn new(project_id: Uuid, base_url: impl Into<String>, config: ScanConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            base_url: base_url.into(),
            status: ScanStatus::Queued,
            config,
            progress: ScanProgress::default(),
            summary: None,
            score: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// 推进扫描状态
    ///
    /// # 参数
    ///
    /// * `next` - 目标状态
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 转换成功
    /// * `Err(DomainError)` - 非法转换
    pub fn transition_to(&mut self, next: ScanStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition);
        }
        self.status = next;
        match next {
            ScanStatus::Crawling => self.started_at = Some(Utc::now()),
            s if s.is_terminal() => self.completed_at = Some(Utc::now()),
            _ => {}
        }
        Ok(())
    }
}

/// 任务负载（编排器与工作器池之间的内部线格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJobPayload {
    /// 扫描ID
    pub scan_id: Uuid,
    /// 项目ID
    pub project_id: Uuid,
    /// 起始URL
    pub base_url: String,
    /// 扫描配置
    pub config: ScanConfig,
}

/// 单页扫描任务负载
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageScanPayload {
    /// 扫描ID
    pub scan_id: Uuid,
    /// 页面URL
    pub url: String,
    /// 发现深度
    pub depth: u32,
    /// 扫描配置
    pub config: ScanConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_never_regresses() {
        assert!(!ScanStatus::Scanning.can_transition_to(ScanStatus::Crawling));
        assert!(!ScanStatus::Completed.can_transition_to(ScanStatus::Scanning));
        assert!(!ScanStatus::Crawling.can_transition_to(ScanStatus::Queued));
    }

    #[test]
    fn test_cancelled_reachable_from_queued_and_scanning_only() {
        assert!(ScanStatus::Queued.can_transition_to(ScanStatus::Cancelled));
        assert!(ScanStatus::Scanning.can_transition_to(ScanStatus::Cancelled));
        assert!(!ScanStatus::Crawling.can_transition_to(ScanStatus::Cancelled));
        assert!(!ScanStatus::Completed.can_transition_to(ScanStatus::Cancelled));
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut scan = Scan::new(Uuid::new_v4(), "https://example.com", ScanConfig::default());
        scan.transition_to(ScanStatus::Crawling).unwrap();
        assert!(scan.started_at.is_some());
        scan.transition_to(ScanStatus::Scanning).unwrap();
        scan.transition_to(ScanStatus::Completed).unwrap();
        assert!(scan.completed_at.is_some());

        // 终态不可再转换
        assert!(scan.transition_to(ScanStatus::Failed).is_err());
    }
}

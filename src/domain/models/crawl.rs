// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 爬取目标
///
/// 规范化后的URL及其发现深度。URL在任何集合判重前
/// 均已规范化，同一页面不会被访问两次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTarget {
    /// 规范化URL
    pub url: String,
    /// 距起始URL的跳数
    pub depth: u32,
}

impl CrawlTarget {
    pub fn new(url: String, depth: u32) -> Self {
        Self { url, depth }
    }
}

/// 扫描范围类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// 完整站点扫描
    #[default]
    FullSite,
    /// 仅扫描起始URL一个页面
    SinglePage,
}

/// 爬取请求
///
/// Crawler的输入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// 起始URL
    pub start_url: String,
    /// 最大深度
    pub max_depth: u32,
    /// 最大页面数
    pub max_pages: usize,
    /// 包含模式（为空时全部通过）
    pub include_patterns: Vec<String>,
    /// 排除模式（命中时优先于包含模式）
    pub exclude_patterns: Vec<String>,
    /// 是否遵循robots.txt（仅咨询性质）
    pub respect_robots: bool,
    /// 扫描范围
    pub scan_type: ScanType,
}

impl CrawlRequest {
    /// 创建默认爬取请求
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: 3,
            max_pages: 100,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            respect_robots: true,
            scan_type: ScanType::FullSite,
        }
    }
}

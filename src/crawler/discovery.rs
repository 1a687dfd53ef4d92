// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::crawler::robots::{RobotsCheckerTrait, RobotsChecker};
use crate::crawler::sitemap;
use crate::domain::models::crawl::{CrawlRequest, CrawlTarget, ScanType};
use crate::utils::errors::CrawlerError;
use crate::utils::url_utils;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// 爬虫的User-Agent
const USER_AGENT: &str = "a11yscan-bot/1.0";

/// 不作为页面访问的资源扩展名
const EXCLUDED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "pdf", "zip", "gz", "tar", "rar",
    "7z", "mp3", "mp4", "avi", "mov", "webm", "ogg", "wav", "doc", "docx", "xls", "xlsx", "ppt",
    "pptx", "woff", "woff2", "ttf", "eot", "otf", "css", "js", "mjs", "json", "rss", "atom",
];

/// 页面发现爬虫
///
/// 给定起始URL与限制条件，发现一份有界且去重的站内页面列表。
/// 优先尝试sitemap，失败时回退到广度优先链接遍历。
/// 单页抓取失败只会缩小结果，不会使整个爬取失败。
pub struct Crawler {
    /// HTTP客户端
    client: Client,
    /// Robots.txt检查器
    robots: Arc<dyn RobotsCheckerTrait>,
    /// 每层深度的并发抓取上限
    fetch_concurrency: usize,
    /// 单页抓取超时
    fetch_timeout: Duration,
}

impl Default for Crawler {
    fn default() -> Self {
        let client = Client::new();
        let robots = Arc::new(RobotsChecker::new(client.clone()));
        Self::new(client, robots, 5)
    }
}

impl Crawler {
    /// 创建新的爬虫实例
    ///
    /// # 参数
    ///
    /// * `client` - HTTP客户端（与robots检查器共享）
    /// * `robots` - Robots.txt检查器
    /// * `fetch_concurrency` - 每层深度的并发抓取上限
    pub fn new(
        client: Client,
        robots: Arc<dyn RobotsCheckerTrait>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            client,
            robots,
            fetch_concurrency: fetch_concurrency.max(1),
            fetch_timeout: Duration::from_secs(15),
        }
    }

    /// 发现站内页面
    ///
    /// # 参数
    ///
    /// * `request` - 爬取请求参数
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<CrawlTarget>)` - 规范化且去重后的页面列表，
    ///   数量不超过`max_pages`，深度不超过`max_depth`
    /// * `Err(CrawlerError::InvalidStartUrl)` - 起始URL无法解析
    pub async fn discover(&self, request: &CrawlRequest) -> Result<Vec<CrawlTarget>, CrawlerError> {
        let start_canon = url_utils::canonicalize(&request.start_url)
            .map_err(|e| CrawlerError::InvalidStartUrl(format!("{}: {}", request.start_url, e)))?;
        let start_url = Url::parse(&start_canon)
            .map_err(|e| CrawlerError::InvalidStartUrl(format!("{}: {}", start_canon, e)))?;
        if start_url.host_str().is_none() {
            return Err(CrawlerError::InvalidStartUrl(request.start_url.clone()));
        }

        // 页面预算为零时结果必须为空，单页快捷路径不得绕过上限
        if request.max_pages == 0 {
            return Ok(Vec::new());
        }

        // 单页扫描：无论深度设置，结果恰好是规范化的起始URL
        if request.scan_type == ScanType::SinglePage || request.max_pages == 1 {
            return Ok(vec![CrawlTarget::new(start_canon, 0)]);
        }

        if let Some(targets) = self.discover_via_sitemap(&start_url, request).await {
            info!(pages = targets.len(), "Discovered pages via sitemap");
            return Ok(targets);
        }

        let targets = self.traverse(start_url, start_canon, request).await;
        info!(pages = targets.len(), "Discovered pages via link traversal");
        Ok(targets)
    }

    /// 基于sitemap的页面发现
    ///
    /// sitemap缺失或过滤后为空时返回None，回退到链接遍历
    async fn discover_via_sitemap(
        &self,
        start_url: &Url,
        request: &CrawlRequest,
    ) -> Option<Vec<CrawlTarget>> {
        let raw_urls = sitemap::fetch_sitemap_urls(&self.client, start_url).await;
        if raw_urls.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for raw in raw_urls {
            if targets.len() >= request.max_pages {
                break;
            }
            let Ok(canon) = url_utils::canonicalize(&raw) else {
                continue;
            };
            let Ok(url) = Url::parse(&canon) else {
                continue;
            };
            if !url_utils::same_domain(&url, start_url)
                || !passes_filters(&url, &request.include_patterns, &request.exclude_patterns)
                || !seen.insert(canon.clone())
            {
                continue;
            }
            if request.respect_robots && !self.robots_allows(&canon).await {
                continue;
            }
            // sitemap条目均视为直接可达
            targets.push(CrawlTarget::new(canon, 0));
        }

        if targets.is_empty() {
            None
        } else {
            Some(targets)
        }
    }

    /// 广度优先链接遍历
    ///
    /// 每层深度内以有界并发抓取当前队列中的页面，提取站内链接
    /// 作为下一层的种子。每个URL最多访问一次（以规范化形式判重）。
    async fn traverse(
        &self,
        start_url: Url,
        start_canon: String,
        request: &CrawlRequest,
    ) -> Vec<CrawlTarget> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start_canon.clone());

        let mut targets = vec![CrawlTarget::new(start_canon.clone(), 0)];
        let mut frontier = vec![start_canon];
        let mut depth: u32 = 0;

        while !frontier.is_empty() && depth < request.max_depth && targets.len() < request.max_pages
        {
            let pages: Vec<(String, Vec<String>)> = stream::iter(frontier.drain(..))
                .map(|url| async move {
                    let links = self.fetch_links(&url).await;
                    (url, links)
                })
                .buffer_unordered(self.fetch_concurrency)
                .collect()
                .await;

            let mut next_frontier = Vec::new();
            'pages: for (_page, links) in pages {
                for link in links {
                    if targets.len() >= request.max_pages {
                        break 'pages;
                    }
                    let Ok(canon) = url_utils::canonicalize(&link) else {
                        continue;
                    };
                    let Ok(url) = Url::parse(&canon) else {
                        continue;
                    };
                    if !url_utils::same_domain(&url, &start_url)
                        || !passes_filters(
                            &url,
                            &request.include_patterns,
                            &request.exclude_patterns,
                        )
                        || visited.contains(&canon)
                    {
                        continue;
                    }
                    if request.respect_robots && !self.robots_allows(&canon).await {
                        debug!("Robots disallows {}", canon);
                        continue;
                    }
                    visited.insert(canon.clone());
                    targets.push(CrawlTarget::new(canon.clone(), depth + 1));
                    next_frontier.push(canon);
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        targets
    }

    /// 抓取单个页面并提取其中的链接
    ///
    /// 抓取失败只记录日志并返回空列表（部分结果优于失败）
    async fn fetch_links(&self, url: &str) -> Vec<String> {
        let response = match self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.fetch_timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Page fetch failed for {}: {}", url, e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!("Page fetch for {} returned status {}", url, response.status());
            return Vec::new();
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty() && !content_type.contains("html") {
            return Vec::new();
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to read body for {}: {}", url, e);
                return Vec::new();
            }
        };

        extract_links(&body, url)
    }

    async fn robots_allows(&self, url: &str) -> bool {
        // 咨询性质：检查本身失败时放行
        self.robots.is_allowed(url, USER_AGENT).await.unwrap_or(true)
    }
}

/// 从HTML内容中提取链接
///
/// 忽略锚点、mailto和javascript链接，仅保留http/https，
/// 并去除fragment以提高去重命中率
pub fn extract_links(html_content: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let fragment = Html::parse_document(html_content);
    let selector = Selector::parse("a[href]").expect("anchor selector is valid");

    let mut links = Vec::new();
    let mut seen = HashSet::new();
    for element in fragment.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
            {
                continue;
            }
            if let Ok(mut url) = base.join(href) {
                if url.scheme() == "http" || url.scheme() == "https" {
                    url.set_fragment(None);
                    let s = url.to_string();
                    if seen.insert(s.clone()) {
                        links.push(s);
                    }
                }
            }
        }
    }

    links
}

/// 应用允许/拒绝过滤
///
/// 排除模式命中时优先于包含模式；包含模式为空时默认通过；
/// 资源扩展名在固定拒绝列表上的URL一律排除
pub fn passes_filters(url: &Url, include_patterns: &[String], exclude_patterns: &[String]) -> bool {
    if let Some(ext) = url.path().rsplit('.').next() {
        if url.path().contains('.') && EXCLUDED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            return false;
        }
    }

    let link = url.as_str();
    if exclude_patterns.iter().any(|p| link.contains(p.as_str())) {
        return false;
    }
    include_patterns.is_empty() || include_patterns.iter().any(|p| link.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::robots::AllowAllChecker;

    #[tokio::test]
    async fn test_zero_page_budget_yields_no_targets() {
        let crawler = Crawler::new(Client::new(), Arc::new(AllowAllChecker), 2);
        let mut request = CrawlRequest::new("https://example.com");
        request.max_pages = 0;

        let targets = crawler.discover(&request).await.unwrap();
        assert!(targets.is_empty());

        // 单页模式同样受预算约束
        request.scan_type = ScanType::SinglePage;
        let targets = crawler.discover(&request).await.unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_extract_links_resolves_and_dedups() {
        let html = r##"<html><body>
            <a href="/about">About</a>
            <a href="/about#team">Team</a>
            <a href="https://example.com/contact">Contact</a>
            <a href="https://other.com/page">External</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
        </body></html>"##;

        let links = extract_links(html, "https://example.com/");
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/contact",
                "https://other.com/page",
            ]
        );
    }

    #[test]
    fn test_filters_exclude_beats_include() {
        let url = Url::parse("https://example.com/blog/admin/settings").unwrap();
        assert!(!passes_filters(
            &url,
            &["/blog".to_string()],
            &["/admin".to_string()]
        ));
    }

    #[test]
    fn test_filters_include_empty_passes_all() {
        let url = Url::parse("https://example.com/anything").unwrap();
        assert!(passes_filters(&url, &[], &[]));
    }

    #[test]
    fn test_filters_binary_extensions_rejected() {
        for path in ["/logo.png", "/doc.PDF", "/style.css", "/app.js"] {
            let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
            assert!(!passes_filters(&url, &[], &[]), "{} should be rejected", path);
        }
        let url = Url::parse("https://example.com/about.html").unwrap();
        assert!(passes_filters(&url, &[], &[]));
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

static LOC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("loc regex is valid")
});

/// 从站点的 /sitemap.xml 提取URL列表
///
/// 只做一层解析：返回 `<loc>` 条目原文，不递归抓取
/// sitemap索引中的子sitemap。获取失败或内容为空时返回空列表，
/// 由调用方回退到链接遍历。
///
/// # 参数
///
/// * `client` - HTTP客户端
/// * `base` - 站点任意URL，用于推导origin
///
/// # 返回值
///
/// sitemap中列出的URL（未规范化、未过滤）
pub async fn fetch_sitemap_urls(client: &Client, base: &Url) -> Vec<String> {
    let sitemap_url = match base.join("/sitemap.xml") {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let body = match client
        .get(sitemap_url.clone())
        .header("User-Agent", "a11yscan-bot/1.0")
        .timeout(Duration::from_secs(10))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
        Ok(resp) => {
            debug!("No sitemap at {} (status {})", sitemap_url, resp.status());
            return Vec::new();
        }
        Err(e) => {
            debug!("Sitemap fetch failed for {}: {}", sitemap_url, e);
            return Vec::new();
        }
    };

    // sitemap索引的<loc>指向子sitemap文件而非页面，跳过
    if body.contains("<sitemapindex") {
        debug!("Sitemap index found at {}, falling back to traversal", sitemap_url);
        return Vec::new();
    }

    LOC_RE
        .captures_iter(&body)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

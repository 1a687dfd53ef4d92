// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否被允许访问
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool>;
}

/// 缓存的Robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    /// 内容
    content: String,

    /// 过期时间
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 仅咨询性质：robots.txt获取失败时降级为全部允许。
/// 按host缓存内容，避免每个URL都重新抓取。
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,

    /// 内存缓存
    memory_cache: Arc<Mutex<HashMap<String, CachedRobots>>>,

    /// 缓存有效期
    cache_ttl: Duration,
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let url = Url::parse(url_str)?;
        let content = self.get_robots_content(&url).await;
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, user_agent, url.as_str()))
    }
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    pub fn new(client: Client) -> Self {
        Self {
            client,
            memory_cache: Arc::new(Mutex::new(HashMap::new())),
            cache_ttl: Duration::from_secs(3600),
        }
    }

    /// 获取Robots.txt内容（带缓存）
    ///
    /// 任何失败都返回空内容，即全部允许
    async fn get_robots_content(&self, url: &Url) -> String {
        let robots_url = match (url.scheme(), url.host_str()) {
            (scheme, Some(host)) => match url.port() {
                Some(port) => format!("{}://{}:{}/robots.txt", scheme, host, port),
                None => format!("{}://{}/robots.txt", scheme, host),
            },
            _ => return String::new(),
        };

        // 1. Check memory cache
        {
            let mut cache = self.memory_cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return cached.content.clone();
                }
                cache.remove(&robots_url);
            }
        }

        // 2. Fetch; 404 and transport errors both mean "no rules"
        let content = match self
            .client
            .get(&robots_url)
            .header("User-Agent", "a11yscan-bot/1.0")
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                String::new()
            }
        };

        // 3. Update memory cache
        {
            let mut cache = self.memory_cache.lock();
            cache.insert(
                robots_url,
                CachedRobots {
                    content: content.clone(),
                    expires_at: Instant::now() + self.cache_ttl,
                },
            );
        }

        content
    }
}

/// 放行一切的检查器，用于禁用robots或测试
pub struct AllowAllChecker;

#[async_trait]
impl RobotsCheckerTrait for AllowAllChecker {
    async fn is_allowed(&self, _url_str: &str, _user_agent: &str) -> Result<bool> {
        Ok(true)
    }
}

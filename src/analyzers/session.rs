// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analyzers::traits::Page;
use crate::utils::errors::AnalyzerError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// 页面会话资源池
///
/// 页面渲染资源创建昂贵，在一次扫描的多个页面之间共享而非
/// 每页新建。池以信号量限定并发：每个并发任务独占一个逻辑
/// 会话，同一会话绝不被两个工作器同时使用。
pub struct SessionPool {
    /// 共享HTTP客户端（连接池复用）
    client: Client,
    /// 并发会话数上限
    permits: Arc<Semaphore>,
    /// 单页获取超时
    fetch_timeout: Duration,
}

impl SessionPool {
    /// 创建新的会话池
    ///
    /// # 参数
    ///
    /// * `client` - HTTP客户端
    /// * `max_sessions` - 并发会话数上限
    /// * `fetch_timeout` - 单页获取超时
    pub fn new(client: Client, max_sessions: usize, fetch_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            client,
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
            fetch_timeout,
        })
    }

    /// 获取一个页面会话
    ///
    /// 池已满时等待其他任务释放
    pub async fn acquire(self: &Arc<Self>) -> PageSession {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("session pool semaphore never closes");
        PageSession {
            client: self.client.clone(),
            fetch_timeout: self.fetch_timeout,
            _permit: permit,
        }
    }

    /// 当前可用会话数
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// 页面会话
///
/// 持有池许可，Drop时自动释放回池
pub struct PageSession {
    client: Client,
    fetch_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl PageSession {
    /// 获取页面内容
    ///
    /// # 参数
    ///
    /// * `url` - 页面URL
    ///
    /// # 返回值
    ///
    /// * `Ok(Page)` - 页面内容（非2xx状态也返回，由分析器决定处理）
    /// * `Err(AnalyzerError::PageUnavailable)` - 网络失败
    pub async fn fetch(&self, url: &str) -> Result<Page, AnalyzerError> {
        let parsed =
            Url::parse(url).map_err(|e| AnalyzerError::PageUnavailable(format!("{}: {}", url, e)))?;

        let response = self
            .client
            .get(parsed.clone())
            .header("User-Agent", "a11yscan-bot/1.0")
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| AnalyzerError::PageUnavailable(format!("{}: {}", url, e)))?;

        let status_code = response.status().as_u16();
        let html = response
            .text()
            .await
            .map_err(|e| AnalyzerError::PageUnavailable(format!("{}: {}", url, e)))?;

        Ok(Page {
            url: parsed,
            html,
            status_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let pool = SessionPool::new(Client::new(), 2, Duration::from_secs(5));
        assert_eq!(pool.available(), 2);

        let s1 = pool.acquire().await;
        let s2 = pool.acquire().await;
        assert_eq!(pool.available(), 0);

        drop(s1);
        assert_eq!(pool.available(), 1);
        drop(s2);
        assert_eq!(pool.available(), 2);
    }
}

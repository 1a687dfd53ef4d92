// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::RawFinding;
use crate::utils::errors::AnalyzerError;
use async_trait::async_trait;
use url::Url;

/// 已获取的页面
///
/// 分析器的输入：URL与渲染后的HTML内容
#[derive(Debug, Clone)]
pub struct Page {
    /// 页面URL
    pub url: Url,
    /// HTML内容
    pub html: String,
    /// HTTP状态码
    pub status_code: u16,
}

/// 分析器特质
///
/// 外部分析能力的契约：对一个页面运行检查并返回原始检测结果。
/// 内部规则逻辑任意且可替换；编排核心把任何分析器失败
/// 视为非致命的页面级状况。
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// 分析器名称，用于结果归属与按配置启用
    fn name(&self) -> &'static str;

    /// 对页面执行检查
    ///
    /// # 参数
    ///
    /// * `page` - 已获取的页面
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<RawFinding>)` - 检测到的缺陷列表（可为空）
    /// * `Err(AnalyzerError)` - 超时或执行失败
    async fn analyze(&self, page: &Page) -> Result<Vec<RawFinding>, AnalyzerError>;
}

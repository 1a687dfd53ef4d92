// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::{FindingInstance, Impact, Principle, WcagLevel};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// 聚合后的问题
///
/// 同一签名的多条原始检测结果合并为一条：`detected_by`取并集、
/// `instances`取全部实例、`impact`取最高严重度。
/// 每次扫描中每个唯一签名只产生一条。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedIssue {
    /// 去重签名
    pub signature: String,
    /// 规则ID
    pub rule_id: String,
    /// 缺陷描述
    pub description: String,
    /// 严重程度（重复项中的最高值）
    pub impact: Impact,
    /// 关联的WCAG成功准则编号
    pub wcag_criteria: Vec<String>,
    /// WCAG级别
    pub wcag_level: WcagLevel,
    /// 所属原则
    pub principle: Principle,
    /// 上报过该问题的分析器名称并集
    pub detected_by: Vec<String>,
    /// 修复建议
    pub help: Option<String>,
    /// 所有页面上的全部实例
    pub instances: Vec<FindingInstance>,
}

impl AggregatedIssue {
    /// 受影响实例数
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// 计算去重签名
///
/// 签名 = SHA-256(rule_id, description, sorted(wcag_criteria))，
/// 与上报分析器和实例位置无关，保证不同分析器报告的
/// 同一缺陷合并为一条。
///
/// # 参数
///
/// * `rule_id` - 规则ID
/// * `description` - 缺陷描述
/// * `wcag_criteria` - WCAG准则编号列表（无需预先排序）
///
/// # 返回值
///
/// 十六进制编码的签名字符串
pub fn issue_signature(rule_id: &str, description: &str, wcag_criteria: &[String]) -> String {
    let mut sorted = wcag_criteria.to_vec();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    for criterion in &sorted {
        hasher.update([0u8]);
        hasher.update(criterion.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// 问题统计摘要
///
/// 按严重程度、WCAG级别和原则统计的问题数量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSummary {
    /// 问题总数
    pub total_issues: usize,
    /// 实例总数
    pub total_instances: usize,
    /// 按严重程度统计
    pub by_impact: HashMap<Impact, usize>,
    /// 按WCAG级别统计
    pub by_level: HashMap<WcagLevel, usize>,
    /// 按原则统计
    pub by_principle: HashMap<Principle, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_criteria_order() {
        let a = issue_signature(
            "image-alt",
            "Images must have alternate text",
            &["1.1.1".to_string(), "4.1.2".to_string()],
        );
        let b = issue_signature(
            "image-alt",
            "Images must have alternate text",
            &["4.1.2".to_string(), "1.1.1".to_string()],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_differs_by_rule() {
        let a = issue_signature("image-alt", "desc", &["1.1.1".to_string()]);
        let b = issue_signature("input-label", "desc", &["1.1.1".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_separator_prevents_collision() {
        // 字段拼接必须有分隔，"ab"+"c" 不能等于 "a"+"bc"
        let a = issue_signature("ab", "c", &[]);
        let b = issue_signature("a", "bc", &[]);
        assert_ne!(a, b);
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::RawFinding;
use crate::domain::models::issue::{issue_signature, AggregatedIssue, IssueSummary};
use std::collections::HashMap;
use tracing::debug;

/// 问题聚合服务
///
/// 将一次扫描所有页面收集到的原始检测结果去重合并为
/// 规范的问题列表
pub struct AggregationService;

impl AggregationService {
    /// 聚合原始检测结果
    ///
    /// 按签名（rule_id + description + 排序后的wcag_criteria）分组，
    /// 同签名的结果合并：分析器名称取并集、实例拼接、
    /// 严重度取观察到的最高值。输出按严重度降序、规则ID升序排列。
    ///
    /// # 参数
    ///
    /// * `findings` - 全部页面的原始检测结果
    ///
    /// # 返回值
    ///
    /// 去重后的聚合问题列表
    pub fn aggregate(findings: Vec<RawFinding>) -> Vec<AggregatedIssue> {
        let raw_count = findings.len();
        let mut by_signature: HashMap<String, AggregatedIssue> = HashMap::new();

        for finding in findings {
            let signature =
                issue_signature(&finding.rule_id, &finding.description, &finding.wcag_criteria);

            match by_signature.get_mut(&signature) {
                Some(issue) => {
                    if !issue.detected_by.contains(&finding.detected_by) {
                        issue.detected_by.push(finding.detected_by);
                    }
                    issue.instances.extend(finding.instances);
                    if finding.impact > issue.impact {
                        issue.impact = finding.impact;
                    }
                    if issue.help.is_none() {
                        issue.help = finding.help;
                    }
                }
                None => {
                    let mut criteria = finding.wcag_criteria;
                    criteria.sort();
                    by_signature.insert(
                        signature.clone(),
                        AggregatedIssue {
                            signature,
                            rule_id: finding.rule_id,
                            description: finding.description,
                            impact: finding.impact,
                            wcag_criteria: criteria,
                            wcag_level: finding.wcag_level,
                            principle: finding.principle,
                            detected_by: vec![finding.detected_by],
                            help: finding.help,
                            instances: finding.instances,
                        },
                    );
                }
            }
        }

        let mut issues: Vec<AggregatedIssue> = by_signature.into_values().collect();
        issues.sort_by(|a, b| b.impact.cmp(&a.impact).then(a.rule_id.cmp(&b.rule_id)));

        debug!(
            raw = raw_count,
            deduplicated = issues.len(),
            "Aggregated findings"
        );
        issues
    }

    /// 生成问题统计摘要
    ///
    /// # 参数
    ///
    /// * `issues` - 聚合问题列表
    ///
    /// # 返回值
    ///
    /// 按严重度、WCAG级别和原则统计的摘要
    pub fn summarize(issues: &[AggregatedIssue]) -> IssueSummary {
        let mut summary = IssueSummary {
            total_issues: issues.len(),
            ..Default::default()
        };

        for issue in issues {
            summary.total_instances += issue.instances.len();
            *summary.by_impact.entry(issue.impact).or_default() += 1;
            *summary.by_level.entry(issue.wcag_level).or_default() += 1;
            *summary.by_principle.entry(issue.principle).or_default() += 1;
        }

        summary
    }
}

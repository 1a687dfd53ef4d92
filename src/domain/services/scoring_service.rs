// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::{Impact, Principle, WcagLevel};
use crate::domain::models::issue::AggregatedIssue;
use crate::domain::models::score::{ComplianceScore, ComplianceTier};
use crate::domain::services::wcag;
use std::collections::HashMap;
use tracing::debug;

/// 合规评分服务
///
/// 根据聚合问题与目标WCAG级别计算0-100的加权合规得分。
///
/// 公式：`overall = max(0, (1 - issue_weight / total_weight) * 100)`。
/// `issue_weight`对目标级别内的每个问题累加
/// `impact_weight * level_weight`；`total_weight`是基线，
/// 对目标级别下所有适用准则按Serious严重度累加
/// `impact_weight(Serious) * level_weight(准则级别)`，
/// 无论该准则是否被违反。
pub struct ScoringService;

impl ScoringService {
    /// 计算合规评分
    ///
    /// # 参数
    ///
    /// * `issues` - 聚合问题列表
    /// * `target_level` - 目标合规级别
    ///
    /// # 返回值
    ///
    /// 总体得分、各原则得分与合规等级
    pub fn score(issues: &[AggregatedIssue], target_level: WcagLevel) -> ComplianceScore {
        let overall = Self::score_subset(issues, target_level, None);

        let mut by_principle = HashMap::new();
        for principle in Principle::ALL {
            by_principle.insert(
                principle,
                Self::score_subset(issues, target_level, Some(principle)),
            );
        }

        let has_critical = issues
            .iter()
            .any(|i| i.impact == Impact::Critical && i.wcag_level <= target_level);
        let tier = ComplianceTier::derive(overall, has_critical);

        debug!(overall, %tier, %target_level, "Computed compliance score");
        ComplianceScore {
            overall,
            by_principle,
            tier,
        }
    }

    /// 计算一个子集（全体或单一原则）的得分
    ///
    /// 适用准则为零时得分为100
    fn score_subset(
        issues: &[AggregatedIssue],
        target_level: WcagLevel,
        principle: Option<Principle>,
    ) -> f64 {
        let total_weight: f64 = wcag::applicable_criteria(target_level)
            .filter(|c| principle.is_none_or(|p| c.principle == p))
            .map(|c| Impact::Serious.weight() * c.level.weight())
            .sum();

        if total_weight == 0.0 {
            return 100.0;
        }

        let issue_weight: f64 = issues
            .iter()
            .filter(|i| i.wcag_level <= target_level)
            .filter(|i| principle.is_none_or(|p| i.principle == p))
            .map(|i| i.impact.weight() * i.wcag_level.weight())
            .sum();

        ((1.0 - issue_weight / total_weight) * 100.0).max(0.0)
    }
}

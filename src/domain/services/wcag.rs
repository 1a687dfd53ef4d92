// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::{Principle, WcagLevel};

/// WCAG成功准则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    /// 准则编号（如 "1.1.1"）
    pub id: &'static str,
    /// 合规级别
    pub level: WcagLevel,
    /// 所属原则
    pub principle: Principle,
}

const fn c(id: &'static str, level: WcagLevel, principle: Principle) -> Criterion {
    Criterion {
        id,
        level,
        principle,
    }
}

/// WCAG 2.1 全部成功准则目录
///
/// A级30条、AA级20条、AAA级28条，共78条。
/// 评分公式的基线权重在此目录上计算。
pub const CRITERIA: &[Criterion] = &[
    // 可感知 (1.x)
    c("1.1.1", WcagLevel::A, Principle::Perceivable),
    c("1.2.1", WcagLevel::A, Principle::Perceivable),
    c("1.2.2", WcagLevel::A, Principle::Perceivable),
    c("1.2.3", WcagLevel::A, Principle::Perceivable),
    c("1.2.4", WcagLevel::AA, Principle::Perceivable),
    c("1.2.5", WcagLevel::AA, Principle::Perceivable),
    c("1.2.6", WcagLevel::AAA, Principle::Perceivable),
    c("1.2.7", WcagLevel::AAA, Principle::Perceivable),
    c("1.2.8", WcagLevel::AAA, Principle::Perceivable),
    c("1.2.9", WcagLevel::AAA, Principle::Perceivable),
    c("1.3.1", WcagLevel::A, Principle::Perceivable),
    c("1.3.2", WcagLevel::A, Principle::Perceivable),
    c("1.3.3", WcagLevel::A, Principle::Perceivable),
    c("1.3.4", WcagLevel::AA, Principle::Perceivable),
    c("1.3.5", WcagLevel::AA, Principle::Perceivable),
    c("1.3.6", WcagLevel::AAA, Principle::Perceivable),
    c("1.4.1", WcagLevel::A, Principle::Perceivable),
    c("1.4.2", WcagLevel::A, Principle::Perceivable),
    c("1.4.3", WcagLevel::AA, Principle::Perceivable),
    c("1.4.4", WcagLevel::AA, Principle::Perceivable),
    c("1.4.5", WcagLevel::AA, Principle::Perceivable),
    c("1.4.6", WcagLevel::AAA, Principle::Perceivable),
    c("1.4.7", WcagLevel::AAA, Principle::Perceivable),
    c("1.4.8", WcagLevel::AAA, Principle::Perceivable),
    c("1.4.9", WcagLevel::AAA, Principle::Perceivable),
    c("1.4.10", WcagLevel::AA, Principle::Perceivable),
    c("1.4.11", WcagLevel::AA, Principle::Perceivable),
    c("1.4.12", WcagLevel::AA, Principle::Perceivable),
    c("1.4.13", WcagLevel::AA, Principle::Perceivable),
    // 可操作 (2.x)
    c("2.1.1", WcagLevel::A, Principle::Operable),
    c("2.1.2", WcagLevel::A, Principle::Operable),
    c("2.1.3", WcagLevel::AAA, Principle::Operable),
    c("2.1.4", WcagLevel::A, Principle::Operable),
    c("2.2.1", WcagLevel::A, Principle::Operable),
    c("2.2.2", WcagLevel::A, Principle::Operable),
    c("2.2.3", WcagLevel::AAA, Principle::Operable),
    c("2.2.4", WcagLevel::AAA, Principle::Operable),
    c("2.2.5", WcagLevel::AAA, Principle::Operable),
    c("2.2.6", WcagLevel::AAA, Principle::Operable),
    c("2.3.1", WcagLevel::A, Principle::Operable),
    c("2.3.2", WcagLevel::AAA, Principle::Operable),
    c("2.3.3", WcagLevel::AAA, Principle::Operable),
    c("2.4.1", WcagLevel::A, Principle::Operable),
    c("2.4.2", WcagLevel::A, Principle::Operable),
    c("2.4.3", WcagLevel::A, Principle::Operable),
    c("2.4.4", WcagLevel::A, Principle::Operable),
    c("2.4.5", WcagLevel::AA, Principle::Operable),
    c("2.4.6", WcagLevel::AA, Principle::Operable),
    c("2.4.7", WcagLevel::AA, Principle::Operable),
    c("2.4.8", WcagLevel::AAA, Principle::Operable),
    c("2.4.9", WcagLevel::AAA, Principle::Operable),
    c("2.4.10", WcagLevel::AAA, Principle::Operable),
    c("2.5.1", WcagLevel::A, Principle::Operable),
    c("2.5.2", WcagLevel::A, Principle::Operable),
    c("2.5.3", WcagLevel::A, Principle::Operable),
    c("2.5.4", WcagLevel::A, Principle::Operable),
    c("2.5.5", WcagLevel::AAA, Principle::Operable),
    c("2.5.6", WcagLevel::AAA, Principle::Operable),
    // 可理解 (3.x)
    c("3.1.1", WcagLevel::A, Principle::Understandable),
    c("3.1.2", WcagLevel::AA, Principle::Understandable),
    c("3.1.3", WcagLevel::AAA, Principle::Understandable),
    c("3.1.4", WcagLevel::AAA, Principle::Understandable),
    c("3.1.5", WcagLevel::AAA, Principle::Understandable),
    c("3.1.6", WcagLevel::AAA, Principle::Understandable),
    c("3.2.1", WcagLevel::A, Principle::Understandable),
    c("3.2.2", WcagLevel::A, Principle::Understandable),
    c("3.2.3", WcagLevel::AA, Principle::Understandable),
    c("3.2.4", WcagLevel::AA, Principle::Understandable),
    c("3.2.5", WcagLevel::AAA, Principle::Understandable),
    c("3.3.1", WcagLevel::A, Principle::Understandable),
    c("3.3.2", WcagLevel::A, Principle::Understandable),
    c("3.3.3", WcagLevel::AA, Principle::Understandable),
    c("3.3.4", WcagLevel::AA, Principle::Understandable),
    c("3.3.5", WcagLevel::AAA, Principle::Understandable),
    c("3.3.6", WcagLevel::AAA, Principle::Understandable),
    // 健壮性 (4.x)
    c("4.1.1", WcagLevel::A, Principle::Robust),
    c("4.1.2", WcagLevel::A, Principle::Robust),
    c("4.1.3", WcagLevel::AA, Principle::Robust),
];

/// 目标级别下适用的准则（级别 <= 目标级别）
pub fn applicable_criteria(target: WcagLevel) -> impl Iterator<Item = &'static Criterion> {
    CRITERIA.iter().filter(move |c| c.level <= target)
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::finding::Principle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 合规评分
///
/// 由聚合问题与目标级别一次性推导得出，0-100，
/// 不作为可变状态持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceScore {
    /// 总体得分 (0-100)
    pub overall: f64,
    /// 各原则得分 (0-100)
    pub by_principle: HashMap<Principle, f64>,
    /// 合规等级
    pub tier: ComplianceTier,
}

/// 合规等级
///
/// 由数值得分与是否存在Critical问题共同推导的粗粒度分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTier {
    /// 达到AAA（得分 >= 95 且无Critical问题）
    Aaa,
    /// 达到AA（得分 >= 85 且无Critical问题）
    Aa,
    /// 达到A（得分 >= 75 且无Critical问题）
    A,
    /// 不合规
    NonCompliant,
}

impl ComplianceTier {
    /// 根据得分与Critical问题推导等级
    ///
    /// 存在任何Critical问题时无论得分一律不合规
    pub fn derive(score: f64, has_critical: bool) -> Self {
        if has_critical {
            return ComplianceTier::NonCompliant;
        }
        if score >= 95.0 {
            ComplianceTier::Aaa
        } else if score >= 85.0 {
            ComplianceTier::Aa
        } else if score >= 75.0 {
            ComplianceTier::A
        } else {
            ComplianceTier::NonCompliant
        }
    }
}

impl fmt::Display for ComplianceTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComplianceTier::Aaa => write!(f, "AAA"),
            ComplianceTier::Aa => write!(f, "AA"),
            ComplianceTier::A => write!(f, "A"),
            ComplianceTier::NonCompliant => write!(f, "non-compliant"),
        }
    }
}

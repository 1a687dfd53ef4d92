// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 缺陷严重程度
///
/// 排序用于聚合时取最高严重度：Critical > Serious > Moderate > Minor
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// 轻微
    #[default]
    Minor,
    /// 中等
    Moderate,
    /// 严重
    Serious,
    /// 致命
    Critical,
}

impl Impact {
    /// 评分公式使用的严重度权重
    pub fn weight(&self) -> f64 {
        match self {
            Impact::Critical => 10.0,
            Impact::Serious => 5.0,
            Impact::Moderate => 2.0,
            Impact::Minor => 1.0,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Impact::Critical => write!(f, "critical"),
            Impact::Serious => write!(f, "serious"),
            Impact::Moderate => write!(f, "moderate"),
            Impact::Minor => write!(f, "minor"),
        }
    }
}

impl FromStr for Impact {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Impact::Critical),
            "serious" => Ok(Impact::Serious),
            "moderate" => Ok(Impact::Moderate),
            "minor" => Ok(Impact::Minor),
            _ => Err(()),
        }
    }
}

/// WCAG合规级别
///
/// 排序 A < AA < AAA，用于判断问题是否落在目标级别内
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum WcagLevel {
    A,
    #[default]
    AA,
    AAA,
}

impl WcagLevel {
    /// 评分公式使用的级别权重
    pub fn weight(&self) -> f64 {
        match self {
            WcagLevel::A => 3.0,
            WcagLevel::AA => 2.0,
            WcagLevel::AAA => 1.0,
        }
    }
}

impl fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WcagLevel::A => write!(f, "A"),
            WcagLevel::AA => write!(f, "AA"),
            WcagLevel::AAA => write!(f, "AAA"),
        }
    }
}

impl FromStr for WcagLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(WcagLevel::A),
            "AA" => Ok(WcagLevel::AA),
            "AAA" => Ok(WcagLevel::AAA),
            _ => Err(()),
        }
    }
}

/// WCAG四大原则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principle {
    /// 可感知
    Perceivable,
    /// 可操作
    Operable,
    /// 可理解
    Understandable,
    /// 健壮性
    Robust,
}

impl Principle {
    /// 全部原则，按WCAG编号顺序
    pub const ALL: [Principle; 4] = [
        Principle::Perceivable,
        Principle::Operable,
        Principle::Understandable,
        Principle::Robust,
    ];
}

impl fmt::Display for Principle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Principle::Perceivable => write!(f, "perceivable"),
            Principle::Operable => write!(f, "operable"),
            Principle::Understandable => write!(f, "understandable"),
            Principle::Robust => write!(f, "robust"),
        }
    }
}

/// 缺陷实例
///
/// 一条缺陷在页面上的一次具体出现位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingInstance {
    /// 页面URL
    pub page_url: String,
    /// CSS选择器
    pub selector: String,
    /// HTML片段
    pub snippet: String,
}

/// 原始检测结果
///
/// 分析器在单个页面上报告的一条缺陷，产生后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    /// 规则ID
    pub rule_id: String,
    /// 缺陷描述
    pub description: String,
    /// 严重程度
    pub impact: Impact,
    /// 关联的WCAG成功准则编号（如 "1.1.1"）
    pub wcag_criteria: Vec<String>,
    /// WCAG级别
    pub wcag_level: WcagLevel,
    /// 所属原则
    pub principle: Principle,
    /// 上报该缺陷的分析器名称
    pub detected_by: String,
    /// 修复建议
    pub help: Option<String>,
    /// 缺陷实例列表
    pub instances: Vec<FindingInstance>,
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含问题聚合、合规评分与WCAG准则目录
pub mod aggregation_service;
pub mod scoring_service;
pub mod wcag;

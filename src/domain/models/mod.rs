// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 定义系统中的核心实体：任务、扫描、爬取目标、
/// 检测结果、聚合问题与合规评分
pub mod crawl;
pub mod finding;
pub mod issue;
pub mod job;
pub mod scan;
pub mod score;

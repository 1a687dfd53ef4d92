// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 分析器模块
///
/// 定义页面分析器接口、会话池和内置的启发式分析器
pub mod analyzers;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 爬虫模块
///
/// 实现站点页面发现：站点地图、广度优先遍历和robots.txt
pub mod crawler;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供领域仓库接口的具体实现
pub mod infrastructure;

/// 编排器模块
///
/// 驱动完整扫描生命周期：爬取、分发、聚合和评分
pub mod orchestrator;

/// 队列模块
///
/// 实现优先级任务队列和重试调度
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台任务处理和工作器池管理
pub mod workers;

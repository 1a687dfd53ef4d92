// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 编排器模块
///
/// 驱动完整扫描生命周期：爬取、分发单页扫描、聚合评分
pub mod orchestrator;
pub mod progress;

pub use orchestrator::{OrchestratorConfig, ScanOrchestrationExecutor, ScanOrchestrator};
pub use progress::{ProgressTracker, ScanEventSink};

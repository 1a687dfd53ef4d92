// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 实现任务执行器、工作器循环与可动态伸缩的工作器池
pub mod executor;
pub mod pool;
pub mod worker;

pub use executor::{JobExecutor, PageScanExecutor, PageScanOutcome};
pub use pool::{PoolConfig, PoolHealth, WorkerPool};

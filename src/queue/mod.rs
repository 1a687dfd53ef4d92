// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 实现有界的优先级任务队列与重试调度
pub mod job_queue;

pub use job_queue::{JobQueue, QueueConfig};

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 分析器模块
///
/// 定义可插拔的页面分析能力接口、页面会话资源池
/// 以及内置的静态HTML启发式分析器
pub mod heuristic;
pub mod session;
pub mod traits;

pub use heuristic::HeuristicAnalyzer;
pub use session::{PageSession, SessionPool};
pub use traits::{Analyzer, Page};

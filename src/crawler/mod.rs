// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 爬虫模块
///
/// 负责页面发现：优先使用sitemap，否则进行有界的
/// 广度优先链接遍历
pub mod discovery;
pub mod robots;
pub mod sitemap;

pub use discovery::Crawler;

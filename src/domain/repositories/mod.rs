// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义持久化协作方的窄接口，核心不持有任何存储逻辑
pub mod scan_repository;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod in_memory_scan_repo;

pub use in_memory_scan_repo::InMemoryScanRepository;

/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]

pub mod builder;
pub mod centrality;
pub mod engine;
pub mod graph;
pub mod ids;
pub mod mailbox;

pub use builder::PartitionedGraphBuilder;
pub use centrality::{betweenness, Betweenness};
pub use graph::{PartitionStrategy, PartitionedGraph, Processor};

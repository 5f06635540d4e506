/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Building partitioned graphs from arc lists.
//!
//! The builder assigns vertices to partitions under a
//! [`PartitionStrategy`], lays out one CSR subgraph per partition with
//! [encoded](crate::ids::encode) endpoints, discovers the boundary set of
//! every ordered partition pair, remaps remote endpoints to mailbox slots,
//! and allocates the paired outbox/inbox mailboxes with identical slot
//! order.

use crate::graph::{CsrSubgraph, Partition, PartitionStrategy, PartitionedGraph, Processor};
use crate::ids::{self, MAX_PARTITION_COUNT};
use crate::mailbox::Mailbox;
use anyhow::{ensure, Result};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;

/// A builder for [`PartitionedGraph`].
///
/// # Examples
///
/// ```
/// use bspgraph::{PartitionedGraphBuilder, PartitionStrategy, Processor};
///
/// let graph = PartitionedGraphBuilder::new(4)
///     .arcs([(0, 1), (1, 0), (1, 2), (2, 1), (2, 3), (3, 2)])
///     .num_partitions(2)
///     .strategy(PartitionStrategy::HighDegree)
///     .processors(vec![Processor::Accelerator, Processor::Cpu])
///     .build()
///     .unwrap();
/// assert_eq!(graph.num_partitions(), 2);
/// assert_eq!(graph.num_arcs(), 6);
/// ```
pub struct PartitionedGraphBuilder {
    num_vertices: usize,
    arcs: Vec<(usize, usize)>,
    num_partitions: usize,
    strategy: PartitionStrategy,
    processors: Vec<Processor>,
    seed: u64,
}

impl PartitionedGraphBuilder {
    /// Creates a builder for a graph with the given number of vertices and
    /// no arcs, defaulting to a single CPU partition.
    pub fn new(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            arcs: Vec::new(),
            num_partitions: 1,
            strategy: PartitionStrategy::Random,
            processors: Vec::new(),
            seed: 0,
        }
    }

    /// Adds an arc.
    pub fn arc(&mut self, u: usize, v: usize) -> &mut Self {
        self.arcs.push((u, v));
        self
    }

    /// Adds arcs from an iterator.
    pub fn arcs(&mut self, arcs: impl IntoIterator<Item = (usize, usize)>) -> &mut Self {
        self.arcs.extend(arcs);
        self
    }

    /// Sets the number of partitions (default: 1).
    pub fn num_partitions(&mut self, num_partitions: usize) -> &mut Self {
        self.num_partitions = num_partitions;
        self
    }

    /// Sets the partitioning strategy (default:
    /// [`Random`](PartitionStrategy::Random)).
    pub fn strategy(&mut self, strategy: PartitionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Sets the processor kind of each partition (default: all
    /// [`Cpu`](Processor::Cpu)).
    pub fn processors(&mut self, processors: Vec<Processor>) -> &mut Self {
        self.processors = processors;
        self
    }

    /// Sets the seed of the [`Random`](PartitionStrategy::Random) deal.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Builds the partitioned graph.
    pub fn build(&self) -> Result<PartitionedGraph> {
        let num_vertices = self.num_vertices;
        let num_partitions = self.num_partitions;
        ensure!(
            (1..=MAX_PARTITION_COUNT).contains(&num_partitions),
            "The number of partitions must be in [1 . . {MAX_PARTITION_COUNT}], got {num_partitions}"
        );
        ensure!(
            self.processors.is_empty() || self.processors.len() == num_partitions,
            "{} processor kinds provided for {num_partitions} partitions",
            self.processors.len()
        );
        for &(u, v) in &self.arcs {
            ensure!(
                u < num_vertices && v < num_vertices,
                "Arc ({u}, {v}) out of range for {num_vertices} vertices"
            );
        }

        let processors = if self.processors.is_empty() {
            vec![Processor::Cpu; num_partitions]
        } else {
            self.processors.clone()
        };

        let mut degree = vec![0usize; num_vertices];
        for &(u, _) in &self.arcs {
            degree[u] += 1;
        }

        // Deal vertices to partitions in strategy order, in contiguous
        // chunks of ⌈V/P⌉.
        let mut order = (0..num_vertices).collect::<Vec<_>>();
        match self.strategy {
            PartitionStrategy::Random => {
                order.shuffle(&mut SmallRng::seed_from_u64(self.seed));
            }
            PartitionStrategy::HighDegree => {
                order.sort_by_key(|&v| (Reverse(degree[v]), v));
            }
            PartitionStrategy::LowDegree => {
                order.sort_by_key(|&v| (degree[v], v));
            }
        }
        let chunk = num_vertices.div_ceil(num_partitions).max(1);
        let mut owner_pid = vec![0usize; num_vertices];
        let mut local = vec![0usize; num_vertices];
        let mut members = vec![Vec::new(); num_partitions];
        for (pid, dealt) in order.chunks(chunk).enumerate() {
            for &v in dealt {
                owner_pid[v] = pid;
                local[v] = members[pid].len();
                members[pid].push(v);
            }
        }

        // Boundary set of each ordered pair: the distinct owner-side local
        // vids that the source partition's arcs reach, in sorted order so
        // that slots can be recovered by binary search.
        let mut boundary = vec![vec![Vec::new(); num_partitions]; num_partitions];
        for &(u, v) in &self.arcs {
            let (pu, pv) = (owner_pid[u], owner_pid[v]);
            if pu != pv {
                boundary[pu][pv].push(local[v]);
            }
        }
        for row in &mut boundary {
            for set in row {
                set.sort_unstable();
                set.dedup();
            }
        }

        let mut partitions = Vec::with_capacity(num_partitions);
        for pid in 0..num_partitions {
            let n = members[pid].len();
            let mut offsets = vec![0usize; n + 1];
            for &(u, _) in &self.arcs {
                if owner_pid[u] == pid {
                    offsets[local[u] + 1] += 1;
                }
            }
            for i in 0..n {
                offsets[i + 1] += offsets[i];
            }
            let mut cursor = offsets.clone();
            let mut edges = vec![0; offsets[n]].into_boxed_slice();
            for &(u, v) in &self.arcs {
                if owner_pid[u] != pid {
                    continue;
                }
                let pv = owner_pid[v];
                let endpoint = if pv == pid {
                    ids::encode(pid, local[v])
                } else {
                    let slot = boundary[pid][pv]
                        .binary_search(&local[v])
                        .expect("boundary sets cover all remote endpoints");
                    ids::encode(pv, slot)
                };
                edges[cursor[local[u]]] = endpoint;
                cursor[local[u]] += 1;
            }

            let outbox = (0..num_partitions)
                .map(|q| mailbox_for(&boundary[pid][q]))
                .collect::<Box<[_]>>();
            let inbox = (0..num_partitions)
                .map(|q| mailbox_for(&boundary[q][pid]))
                .collect::<Box<[_]>>();

            partitions.push(Partition {
                id: pid,
                processor: processors[pid],
                subgraph: CsrSubgraph {
                    offsets: offsets.into_boxed_slice(),
                    edges,
                    map: members[pid].clone().into_boxed_slice(),
                },
                outbox,
                inbox,
            });
        }

        let owner = (0..num_vertices)
            .map(|v| ids::encode(owner_pid[v], local[v]))
            .collect::<Box<[_]>>();

        Ok(PartitionedGraph {
            partitions: partitions.into_boxed_slice(),
            owner,
            num_arcs: self.arcs.len() as u64,
            strategy: self.strategy,
        })
    }
}

fn mailbox_for(boundary: &[usize]) -> Option<Mailbox> {
    if boundary.is_empty() {
        None
    } else {
        Some(Mailbox::new(
            boundary.iter().map(|&v| v as u32).collect::<Box<[_]>>(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paired_mailboxes() -> Result<()> {
        let graph = PartitionedGraphBuilder::new(6)
            .arcs([(0, 3), (1, 3), (2, 4), (3, 0), (4, 2), (5, 0)])
            .num_partitions(3)
            .strategy(PartitionStrategy::LowDegree)
            .build()?;
        for p in graph.partitions() {
            for (q, outbox) in p.outboxes().iter().enumerate() {
                let Some(outbox) = outbox else { continue };
                let inbox = graph.partitions()[q].inbox(p.id()).unwrap();
                assert_eq!(outbox.rmt_nbrs(), inbox.rmt_nbrs());
                assert!(outbox.rmt_nbrs().windows(2).all(|w| w[0] < w[1]));
            }
        }
        Ok(())
    }

    #[test]
    fn test_every_vertex_dealt_once() -> Result<()> {
        for strategy in [
            PartitionStrategy::Random,
            PartitionStrategy::HighDegree,
            PartitionStrategy::LowDegree,
        ] {
            let graph = PartitionedGraphBuilder::new(10)
                .arcs((0..9).map(|v| (v, v + 1)))
                .num_partitions(4)
                .strategy(strategy)
                .build()?;
            let mut seen = vec![false; 10];
            for p in graph.partitions() {
                for v in 0..p.subgraph().num_vertices() {
                    let original = p.subgraph().original_id(v);
                    assert!(!seen[original]);
                    seen[original] = true;
                    assert_eq!(graph.owner_of(original), (p.id(), v));
                }
            }
            assert!(seen.iter().all(|&s| s));
        }
        Ok(())
    }
}

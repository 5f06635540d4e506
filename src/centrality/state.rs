/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-partition betweenness state.

use super::RAYON_MIN_LEN;
use crate::graph::{Partition, Processor};
use crate::ids::{Cost, INF_COST};
use crossbeam_utils::CachePadded;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// The frontier queue of an accelerator partition.
///
/// `list` and `count` are the worker-resident compaction target: blocks
/// reserve ranges with a single `fetch_add` and fill them independently.
pub(crate) struct FrontierQueue {
    pub list: Box<[u32]>,
    pub count: CachePadded<AtomicU32>,
}

impl FrontierQueue {
    fn new(capacity: usize) -> Self {
        Self {
            list: vec![0; capacity].into_boxed_slice(),
            count: CachePadded::new(AtomicU32::new(0)),
        }
    }

    #[inline(always)]
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed) as usize
    }
}

/// The per-partition state of one betweenness computation.
///
/// Local arrays cover the full local vertex set; the `rmt_*` mirrors are
/// sized by the boundary count with each remote partition and indexed by
/// mailbox slot. Everything is allocated once, on the first source, and
/// reset in place between sources.
pub(crate) struct BcState {
    /// BFS level of each local vertex; [`INF_COST`] means unreached.
    pub distance: Box<[AtomicU32]>,
    /// Shortest paths from the source reaching each local vertex.
    pub num_sps: Box<[AtomicU32]>,
    /// Level mirror of each remote boundary vertex, indexed by slot.
    pub rmt_distance: Box<[Box<[AtomicU32]>]>,
    /// Path-count mirror of each remote boundary vertex, indexed by slot.
    pub rmt_num_sps: Box<[Box<[u32]>]>,
    /// Dependency accumulator of each local vertex.
    pub delta: Box<[f32]>,
    /// Betweenness accumulated across all sources.
    pub betweenness: Box<[f32]>,
    /// Host staging copy of `betweenness` (accelerator partitions only).
    pub betweenness_host: Box<[f32]>,
    /// Frontier queue (accelerator partitions only).
    pub frontier: Option<FrontierQueue>,
    /// The BFS level this partition is processing.
    pub level: Cost,
}

impl BcState {
    pub fn new(partition: &Partition) -> Self {
        let n = partition.subgraph().num_vertices();
        let accelerator = partition.processor() == Processor::Accelerator;
        let rmt_len =
            |q: usize| partition.outbox(q).map_or(0, |mailbox| mailbox.len());
        Self {
            distance: atomic_array(n, INF_COST),
            num_sps: atomic_array(n, 0),
            rmt_distance: (0..partition.outboxes().len())
                .map(|q| atomic_array(rmt_len(q), INF_COST))
                .collect(),
            rmt_num_sps: (0..partition.outboxes().len())
                .map(|q| vec![0; rmt_len(q)].into_boxed_slice())
                .collect(),
            delta: vec![0.0; n].into_boxed_slice(),
            betweenness: vec![0.0; n].into_boxed_slice(),
            betweenness_host: vec![0.0; if accelerator { n } else { 0 }].into_boxed_slice(),
            frontier: accelerator.then(|| FrontierQueue::new(n)),
            level: 0,
        }
    }

    /// Resets the forward-phase state for a new source, seeding the source
    /// vertex if it is local.
    pub fn reset_forward(&mut self, source: Option<usize>) {
        self.level = 0;
        fill_atomic(&self.distance, INF_COST);
        fill_atomic(&self.num_sps, 0);
        for mirror in self.rmt_distance.iter() {
            fill_atomic(mirror, INF_COST);
        }
        for mirror in self.rmt_num_sps.iter_mut() {
            mirror.fill(0);
        }
        if let Some(frontier) = &self.frontier {
            frontier.clear();
        }
        if let Some(source) = source {
            self.distance[source].store(0, Ordering::Relaxed);
            self.num_sps[source].store(1, Ordering::Relaxed);
        }
    }

    /// Resets the backward-phase state: zeroed dependencies, level moved
    /// back below the last forward superstep.
    pub fn reset_backward(&mut self) {
        self.delta.fill(0.0);
        self.level = self.level.saturating_sub(1);
    }
}

fn atomic_array(len: usize, value: u32) -> Box<[AtomicU32]> {
    (0..len).map(|_| AtomicU32::new(value)).collect()
}

fn fill_atomic(array: &[AtomicU32], value: u32) {
    array
        .par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|slot| slot.store(value, Ordering::Relaxed));
}

/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The backward phase: dependency accumulation.
//!
//! Levels are processed in descending order, one per superstep. Every
//! vertex on the current level sums, over its successors one level deeper,
//! σ(*v*)/σ(*w*) · (1 + δ(*w*)), stores the sum as its own dependency and
//! adds it to its betweenness. Successor dependencies are read from the
//! local array, or, for remote successors, from the outbox pull slot the
//! owner staged in its gather hook one superstep earlier; the first
//! superstep therefore performs no kernel work — it exists so the deepest
//! level's (zero) dependencies are in place before the first real
//! computation.
//!
//! Dependencies are written without atomics: the outer parallel loop
//! assigns each vertex to exactly one task, and reads only touch vertices
//! one level deeper, which no task writes during the same pass.

use super::state::BcState;
use super::{warp_params, NODE_GRANULARITY, RAYON_MIN_LEN};
use crate::engine::{Direction, Round, Superstep};
use crate::graph::{Partition, PartitionStrategy, Processor};
use crate::ids::{self, Cost, Eid, MAX_THREADS_PER_BLOCK};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use sync_cell_slice::{SyncCell, SyncSlice};

/// One backward round; aggregates into `scores` when `last_source` is set.
pub(crate) struct BackwardRound<'a> {
    pub strategy: PartitionStrategy,
    pub last_source: bool,
    /// `V / num_samples` in sampled mode, 1 otherwise.
    pub scale: f32,
    pub scores: &'a [SyncCell<f32>],
}

impl Round for BackwardRound<'_> {
    type State = BcState;

    fn direction(&self) -> Direction {
        Direction::Pull
    }

    fn init(&self, _partition: &Partition, state: &mut BcState, _superstep: &Superstep) {
        state.reset_backward();
    }

    fn kernel(&self, partition: &Partition, state: &mut BcState, superstep: &Superstep) {
        if superstep.number() > 1 {
            let view = BackwardView::new(partition, state);
            match partition.processor() {
                Processor::Cpu => cpu_kernel(&view),
                Processor::Accelerator => {
                    let (warp_width, batch) = warp_params(self.strategy);
                    accelerator_kernel(&view, warp_width, batch);
                }
            }
        }
        if state.level > 0 {
            state.level -= 1;
        }
        if state.level > 0 {
            superstep.report_not_finished();
        }
    }

    fn gather(&self, partition: &Partition, state: &mut BcState, _superstep: &Superstep) {
        let state = &*state;
        let level = state.level;
        for inbox in partition.inboxes().iter().flatten() {
            inbox
                .rmt_nbrs()
                .par_iter()
                .enumerate()
                .with_min_len(RAYON_MIN_LEN)
                .for_each(|(slot, &vid)| {
                    let vid = vid as usize;
                    if state.distance[vid].load(Ordering::Relaxed) == level + 1 {
                        inbox.stage_pull_f32(slot, state.delta[vid]);
                    }
                });
        }
    }

    fn finalize(&self, partition: &Partition, state: &mut BcState) {
        // Move worker-resident scores to the host staging buffer before
        // aggregation reads them.
        if self.last_source && partition.processor() == Processor::Accelerator {
            state.betweenness_host.copy_from_slice(&state.betweenness);
        }
    }

    fn aggregate(&self, partition: &Partition, state: &mut BcState) {
        if !self.last_source {
            return;
        }
        let subgraph = partition.subgraph();
        let values = match partition.processor() {
            Processor::Accelerator => &state.betweenness_host,
            Processor::Cpu => &state.betweenness,
        };
        let scale = self.scale;
        values
            .par_iter()
            .enumerate()
            .with_min_len(RAYON_MIN_LEN)
            .for_each(|(v, &value)| {
                // SAFETY: every original id is owned by exactly one
                // partition, so no two tasks write the same score.
                unsafe { self.scores[subgraph.original_id(v)].set(value * scale) };
            });
    }
}

/// Borrowed state pieces shared by the backward kernels.
struct BackwardView<'a> {
    partition: &'a Partition,
    level: Cost,
    distance: &'a [AtomicU32],
    num_sps: &'a [AtomicU32],
    rmt_distance: &'a [Box<[AtomicU32]>],
    rmt_num_sps: &'a [Box<[u32]>],
    delta: &'a [SyncCell<f32>],
    betweenness: &'a [SyncCell<f32>],
}

impl<'a> BackwardView<'a> {
    fn new(partition: &'a Partition, state: &'a mut BcState) -> Self {
        Self {
            partition,
            level: state.level,
            distance: &state.distance,
            num_sps: &state.num_sps,
            rmt_distance: &state.rmt_distance,
            rmt_num_sps: &state.rmt_num_sps,
            delta: state.delta.as_sync_slice(),
            betweenness: state.betweenness.as_sync_slice(),
        }
    }

    /// Returns the dependency contribution of one successor edge, or 0 if
    /// the endpoint is not one level deeper.
    #[inline(always)]
    fn dependency(&self, sigma: f32, e: Eid) -> f32 {
        let (pid, nbr) = (ids::partition_id(e), ids::local_id(e));
        if pid == self.partition.id() {
            if self.distance[nbr].load(Ordering::Relaxed) == self.level + 1 {
                let sps = self.num_sps[nbr].load(Ordering::Relaxed) as f32;
                // SAFETY: `nbr` is one level deeper, so no task writes its
                // dependency during this pass.
                let delta = unsafe { self.delta[nbr].get() };
                return sigma / sps * (1.0 + delta);
            }
        } else if self.rmt_distance[pid][nbr].load(Ordering::Relaxed) == self.level + 1 {
            let sps = self.rmt_num_sps[pid][nbr] as f32;
            let delta = self
                .partition
                .outbox(pid)
                .expect("remote endpoints have outboxes")
                .pull_f32(nbr);
            return sigma / sps * (1.0 + delta);
        }
        0.0
    }

    /// Stores a vertex's dependency and adds it to its betweenness.
    ///
    /// # Safety
    ///
    /// The caller must be the only task writing `v` during this pass.
    #[inline(always)]
    unsafe fn commit(&self, v: usize, sum: f32) {
        self.delta[v].set(sum);
        self.betweenness[v].set(self.betweenness[v].get() + sum);
    }
}

fn cpu_kernel(view: &BackwardView) {
    let subgraph = view.partition.subgraph();
    (0..subgraph.num_vertices())
        .into_par_iter()
        .with_min_len(NODE_GRANULARITY)
        .for_each(|v| {
            if view.distance[v].load(Ordering::Relaxed) != view.level {
                return;
            }
            let sigma = view.num_sps[v].load(Ordering::Relaxed) as f32;
            let mut sum = 0.0;
            for &e in subgraph.neighbors(v) {
                sum += view.dependency(sigma, e);
            }
            // SAFETY: the outer loop assigns each vertex to one task.
            unsafe { view.commit(v, sum) };
        });
}

/// Virtual-warp kernel: lanes stride over each vertex's edge list into a
/// warp-local partial array, reduced by halving; only lane 0 writes, and
/// only when the partial sum is nonzero.
fn accelerator_kernel(view: &BackwardView, warp_width: usize, batch: usize) {
    let subgraph = view.partition.subgraph();
    let n = subgraph.num_vertices();
    (0..n.div_ceil(batch)).into_par_iter().for_each(|b| {
        let start = b * batch;
        let end = (start + batch).min(n);
        let mut partial = [0.0f32; MAX_THREADS_PER_BLOCK];
        for v in start..end {
            if view.distance[v].load(Ordering::Relaxed) != view.level {
                continue;
            }
            let sigma = view.num_sps[v].load(Ordering::Relaxed) as f32;
            let neighbors = subgraph.neighbors(v);
            partial[..warp_width].fill(0.0);
            for lane in 0..warp_width.min(neighbors.len()) {
                let mut i = lane;
                while i < neighbors.len() {
                    partial[lane] += view.dependency(sigma, neighbors[i]);
                    i += warp_width;
                }
            }
            let mut stride = warp_width / 2;
            while stride > 0 {
                for lane in 0..stride {
                    partial[lane] += partial[lane + stride];
                }
                stride /= 2;
            }
            if partial[0] > 0.0 {
                // SAFETY: each vertex belongs to exactly one batch.
                unsafe { view.commit(v, partial[0]) };
            }
        }
    });
}

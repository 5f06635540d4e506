/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The forward phase: level-synchronous BFS accumulating path counts.
//!
//! For every local vertex on the current level, the kernel relaxes its
//! edges: an unreached endpoint is moved to the next level (lowering the
//! finished flag), and the vertex's path count is added to every endpoint
//! sitting exactly one level deeper. Local additions go straight to the
//! local array; remote additions land in the outbox push slot of the
//! owner, which applies them in its scatter hook one superstep later.

use super::state::BcState;
use super::{warp_params, NODE_GRANULARITY, RAYON_MIN_LEN};
use crate::engine::{Direction, Round, Superstep};
use crate::graph::{Partition, PartitionStrategy, Processor};
use crate::ids::{self, Cost, Eid, INF_COST, MAX_THREADS_PER_BLOCK};
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use sync_cell_slice::SyncSlice;

/// One forward round, from one source vertex.
pub(crate) struct ForwardRound {
    /// The source as (partition id, local vid).
    pub source: (usize, usize),
    pub strategy: PartitionStrategy,
}

impl Round for ForwardRound {
    type State = BcState;

    fn direction(&self) -> Direction {
        Direction::Push
    }

    fn init(&self, partition: &Partition, state: &mut BcState, _superstep: &Superstep) {
        let source = (partition.id() == self.source.0).then_some(self.source.1);
        state.reset_forward(source);
        for mailbox in partition.outboxes().iter().flatten() {
            mailbox.clear_push();
        }
        for mailbox in partition.inboxes().iter().flatten() {
            mailbox.clear_push();
        }
    }

    fn scatter(&self, partition: &Partition, state: &mut BcState, _superstep: &Superstep) {
        let state = &*state;
        let level = state.level;
        for inbox in partition.inboxes().iter().flatten() {
            inbox
                .push_values()
                .par_iter()
                .enumerate()
                .with_min_len(RAYON_MIN_LEN)
                .for_each(|(slot, value)| {
                    let value = value.load(Ordering::Relaxed);
                    if value == 0 {
                        return;
                    }
                    let vid = inbox.remote_vid(slot);
                    // The double guard accepts additions for a vertex
                    // discovered locally in the same superstep the remote
                    // update was sent, and drops stale ones.
                    if state.distance[vid].load(Ordering::Relaxed) == INF_COST {
                        state.distance[vid].store(level, Ordering::Relaxed);
                    }
                    if state.distance[vid].load(Ordering::Relaxed) == level {
                        state.num_sps[vid].fetch_add(value, Ordering::Relaxed);
                    }
                });
        }
    }

    fn kernel(&self, partition: &Partition, state: &mut BcState, superstep: &Superstep) {
        match partition.processor() {
            Processor::Cpu => cpu_kernel(partition, state, superstep),
            Processor::Accelerator => {
                build_frontier(partition, state);
                let (warp_width, batch) = warp_params(self.strategy);
                accelerator_kernel(partition, state, superstep, warp_width, batch);
            }
        }
        // Writes of this superstep saw the old level; the next superstep's
        // reads must see the new one.
        state.level += 1;
    }
}

/// Relaxes one encoded edge endpoint; returns whether a new vertex was
/// discovered.
#[inline(always)]
fn relax(partition: &Partition, state: &BcState, level: Cost, sigma: u32, e: Eid) -> bool {
    let (pid, nbr) = (ids::partition_id(e), ids::local_id(e));
    let mut found = false;
    if pid == partition.id() {
        if state.distance[nbr].load(Ordering::Relaxed) == INF_COST {
            state.distance[nbr].store(level + 1, Ordering::Relaxed);
            found = true;
        }
        if state.distance[nbr].load(Ordering::Relaxed) == level + 1 {
            state.num_sps[nbr].fetch_add(sigma, Ordering::Relaxed);
        }
    } else {
        let mirror = &state.rmt_distance[pid];
        if mirror[nbr].load(Ordering::Relaxed) == INF_COST {
            mirror[nbr].store(level + 1, Ordering::Relaxed);
            found = true;
        }
        if mirror[nbr].load(Ordering::Relaxed) == level + 1 {
            partition
                .outbox(pid)
                .expect("remote endpoints have outboxes")
                .push_add(nbr, sigma);
        }
    }
    found
}

/// Parallel outer loop over all local vertices; edge lists are walked
/// serially.
fn cpu_kernel(partition: &Partition, state: &BcState, superstep: &Superstep) {
    let level = state.level;
    let finished = superstep.finished_flag();
    (0..partition.subgraph().num_vertices())
        .into_par_iter()
        .with_min_len(NODE_GRANULARITY)
        .for_each(|v| {
            if state.distance[v].load(Ordering::Relaxed) != level {
                return;
            }
            let sigma = state.num_sps[v].load(Ordering::Relaxed);
            for &e in partition.subgraph().neighbors(v) {
                if relax(partition, state, level, sigma, e) {
                    finished.store(false, Ordering::Relaxed);
                }
            }
        });
}

/// Compacts the current level into the frontier queue.
///
/// Each block fills a block-local queue, then claims a range of the global
/// queue with a single `fetch_add`. Launch cost is thus proportional to the
/// frontier, not to the vertex count, in the kernels that follow.
fn build_frontier(partition: &Partition, state: &mut BcState) {
    let level = state.level;
    let distance = &state.distance;
    let frontier = state.frontier.as_mut().expect("accelerator state");
    frontier.clear();
    let count = &frontier.count;
    let list_sync = frontier.list.as_sync_slice();

    let n = partition.subgraph().num_vertices();
    (0..n.div_ceil(MAX_THREADS_PER_BLOCK))
        .into_par_iter()
        .for_each(|block| {
            let start = block * MAX_THREADS_PER_BLOCK;
            let end = (start + MAX_THREADS_PER_BLOCK).min(n);
            let mut block_queue = Vec::with_capacity(end - start);
            for v in start..end {
                if distance[v].load(Ordering::Relaxed) == level {
                    block_queue.push(v as u32);
                }
            }
            if !block_queue.is_empty() {
                let start = count.fetch_add(block_queue.len() as u32, Ordering::Relaxed) as usize;
                for (i, &v) in block_queue.iter().enumerate() {
                    // SAFETY: ranges claimed through `count` are disjoint.
                    unsafe { list_sync[start + i].set(v) };
                }
            }
        });
}

/// Virtual-warp kernel over the frontier.
///
/// Each warp of `warp_width` lanes cooperatively processes a batch of
/// frontier vertices, lanes striding over each vertex's edge list. A block
/// keeps a block-local finished flag and performs at most one store to the
/// partition flag.
fn accelerator_kernel(
    partition: &Partition,
    state: &BcState,
    superstep: &Superstep,
    warp_width: usize,
    batch: usize,
) {
    let level = state.level;
    let finished = superstep.finished_flag();
    let frontier = state.frontier.as_ref().expect("accelerator state");
    frontier.list[..frontier.len()]
        .par_chunks(batch)
        .for_each(|warp_batch| {
            let mut finished_block = true;
            for &v in warp_batch {
                let v = v as usize;
                let sigma = state.num_sps[v].load(Ordering::Relaxed);
                let neighbors = partition.subgraph().neighbors(v);
                for lane in 0..warp_width.min(neighbors.len()) {
                    let mut i = lane;
                    while i < neighbors.len() {
                        if relax(partition, state, level, sigma, neighbors[i]) {
                            finished_block = false;
                        }
                        i += warp_width;
                    }
                }
            }
            if !finished_block {
                finished.store(false, Ordering::Relaxed);
            }
        });
}

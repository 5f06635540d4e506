/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The bulk-synchronous execution engine.
//!
//! A [`Round`] is a unit of computation executed as a sequence of
//! *supersteps*. Within a superstep every partition runs its hooks in
//! parallel, in this order:
//!
//! 1. [`init`](Round::init), on the first superstep only;
//! 2. [`scatter`](Round::scatter), on [`Push`](Direction::Push) rounds:
//!    consumes the inbox messages flushed at the previous superstep
//!    boundary — they target state the kernel is about to read, so they
//!    must land first;
//! 3. [`kernel`](Round::kernel), the per-partition computation;
//! 4. [`gather`](Round::gather), on [`Pull`](Direction::Pull) rounds:
//!    stages values requested by remote partitions into the inbox pull
//!    buffers.
//!
//! After the hooks, the engine performs the message exchange matching the
//! round's direction and checks termination: it raises every partition's
//! finished flag at the start of the superstep, and the round ends once all
//! flags survive a whole superstep. Workers lower their partition's flag
//! through [`Superstep::report_not_finished`] (or directly through the raw
//! flag, for once-per-block writes); no worker ever raises a flag.
//!
//! [`finalize`](Round::finalize) and [`aggregate`](Round::aggregate) run as
//! the tail of the last superstep, after the loop exits.
//!
//! The parallel hook phase is the only place partitions run concurrently;
//! the exchange is the barrier, so all writes of superstep *k* are visible
//! to all reads of superstep *k* + 1.

use crate::graph::{Partition, PartitionedGraph};
use crossbeam_utils::CachePadded;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// The message-exchange direction of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Producers accumulate into their outbox push buffers; the engine
    /// flushes them into the paired inboxes and zeroes the outboxes.
    Push,
    /// Producers stage into their inbox pull buffers; the engine transfers
    /// them back to the paired outboxes.
    Pull,
}

/// Per-superstep context handed to hooks.
pub struct Superstep<'a> {
    number: usize,
    finished: &'a AtomicBool,
}

impl Superstep<'_> {
    /// Returns the 1-based number of the current superstep.
    #[inline(always)]
    pub fn number(&self) -> usize {
        self.number
    }

    /// Forces at least one more superstep.
    #[inline(always)]
    pub fn report_not_finished(&self) {
        self.finished.store(false, Ordering::Relaxed);
    }

    /// Returns the partition's raw finished flag, for workers that batch
    /// their writes.
    #[inline(always)]
    pub fn finished_flag(&self) -> &AtomicBool {
        self.finished
    }
}

/// The hooks of one bulk-synchronous round.
///
/// All hooks default to no-ops; a round implements the ones it needs.
/// Hooks receive the partition, the per-partition algorithm state, and the
/// superstep context.
pub trait Round: Sync {
    /// The per-partition algorithm state.
    type State: Send;

    /// Returns the message-exchange direction of this round.
    fn direction(&self) -> Direction;

    /// Runs on the first superstep, before any other hook.
    fn init(&self, _partition: &Partition, _state: &mut Self::State, _superstep: &Superstep) {}

    /// Consumes the inbox push buffers ([`Push`](Direction::Push) rounds
    /// only).
    fn scatter(&self, _partition: &Partition, _state: &mut Self::State, _superstep: &Superstep) {}

    /// The per-partition computation.
    fn kernel(&self, _partition: &Partition, _state: &mut Self::State, _superstep: &Superstep) {}

    /// Stages the inbox pull buffers ([`Pull`](Direction::Pull) rounds
    /// only).
    fn gather(&self, _partition: &Partition, _state: &mut Self::State, _superstep: &Superstep) {}

    /// Runs once after the last superstep.
    fn finalize(&self, _partition: &Partition, _state: &mut Self::State) {}

    /// Runs once after [`finalize`](Round::finalize).
    fn aggregate(&self, _partition: &Partition, _state: &mut Self::State) {}
}

/// The bulk-synchronous driver for one [`PartitionedGraph`].
pub struct Engine<'a> {
    graph: &'a PartitionedGraph,
    finished: Box<[CachePadded<AtomicBool>]>,
    superstep: usize,
}

impl<'a> Engine<'a> {
    /// Creates an engine over a graph.
    pub fn new(graph: &'a PartitionedGraph) -> Self {
        Self {
            graph,
            finished: (0..graph.num_partitions())
                .map(|_| CachePadded::new(AtomicBool::new(true)))
                .collect(),
            superstep: 0,
        }
    }

    /// Returns the graph this engine drives.
    #[inline(always)]
    pub fn graph(&self) -> &PartitionedGraph {
        self.graph
    }

    /// Returns the 1-based number of the last executed superstep.
    #[inline(always)]
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Runs a round to completion and returns the number of supersteps
    /// executed.
    ///
    /// `states` must hold one algorithm state per partition, in partition
    /// order.
    pub fn execute<R: Round>(&mut self, round: &R, states: &mut [R::State]) -> usize {
        assert_eq!(states.len(), self.graph.num_partitions());
        let partitions = self.graph.partitions();
        self.superstep = 0;

        loop {
            self.superstep += 1;
            let number = self.superstep;
            for finished in self.finished.iter() {
                finished.store(true, Ordering::Relaxed);
            }

            partitions
                .par_iter()
                .zip(states.par_iter_mut())
                .zip(self.finished.par_iter())
                .for_each(|((partition, state), finished)| {
                    let superstep = Superstep {
                        number,
                        finished: &**finished,
                    };
                    if number == 1 {
                        round.init(partition, state, &superstep);
                    }
                    if round.direction() == Direction::Push {
                        round.scatter(partition, state, &superstep);
                    }
                    round.kernel(partition, state, &superstep);
                    if round.direction() == Direction::Pull {
                        round.gather(partition, state, &superstep);
                    }
                });

            self.exchange(round.direction());

            if self
                .finished
                .iter()
                .all(|finished| finished.load(Ordering::Relaxed))
            {
                break;
            }
        }

        partitions
            .par_iter()
            .zip(states.par_iter_mut())
            .for_each(|(partition, state)| {
                round.finalize(partition, state);
                round.aggregate(partition, state);
            });

        self.superstep
    }

    /// Moves one superstep's messages between paired mailboxes.
    fn exchange(&self, direction: Direction) {
        let partitions = self.graph.partitions();
        for partition in partitions {
            for (q, outbox) in partition.outboxes().iter().enumerate() {
                let Some(outbox) = outbox else { continue };
                let inbox = partitions[q]
                    .inbox(partition.id())
                    .expect("mailboxes are paired");
                match direction {
                    Direction::Push => {
                        for (out_slot, in_slot) in
                            outbox.push_values().iter().zip(inbox.push_values())
                        {
                            in_slot.store(out_slot.swap(0, Ordering::Relaxed), Ordering::Relaxed);
                        }
                    }
                    Direction::Pull => {
                        for (out_slot, in_slot) in
                            outbox.pull_values().iter().zip(inbox.pull_values())
                        {
                            out_slot.store(in_slot.load(Ordering::Relaxed), Ordering::Relaxed);
                        }
                    }
                }
            }
        }
    }
}

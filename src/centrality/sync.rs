/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Boundary-mirror synchronization.
//!
//! The forward phase moves only incremental path-count updates through the
//! outboxes, while the backward phase needs, for every boundary vertex,
//! the final level and path count computed by its owner. Each
//! [`MirrorSync`] round installs one of the two full arrays in exactly two
//! supersteps: on the first, every partition stages its authoritative
//! local values into its inbox pull slots (and forces a second superstep);
//! on the second, every partition copies the transferred values into its
//! boundary mirrors. Running a round twice leaves the state unchanged.

use super::state::BcState;
use super::RAYON_MIN_LEN;
use crate::engine::{Direction, Round, Superstep};
use crate::graph::Partition;
use rayon::prelude::*;
use std::sync::atomic::Ordering;

enum MirrorField {
    Distance,
    NumSps,
}

/// A two-superstep pull round installing one boundary-mirror array.
pub(crate) struct MirrorSync {
    field: MirrorField,
}

impl MirrorSync {
    /// Synchronizes the level mirrors.
    pub fn distance() -> Self {
        Self {
            field: MirrorField::Distance,
        }
    }

    /// Synchronizes the path-count mirrors.
    pub fn num_sps() -> Self {
        Self {
            field: MirrorField::NumSps,
        }
    }
}

impl Round for MirrorSync {
    type State = BcState;

    fn direction(&self) -> Direction {
        Direction::Pull
    }

    fn kernel(&self, partition: &Partition, state: &mut BcState, superstep: &Superstep) {
        if superstep.number() == 1 {
            superstep.report_not_finished();
            return;
        }
        match self.field {
            MirrorField::Distance => {
                for (q, outbox) in partition.outboxes().iter().enumerate() {
                    let Some(outbox) = outbox else { continue };
                    state.rmt_distance[q]
                        .par_iter()
                        .enumerate()
                        .with_min_len(RAYON_MIN_LEN)
                        .for_each(|(slot, mirror)| {
                            mirror.store(outbox.pull(slot), Ordering::Relaxed)
                        });
                }
            }
            MirrorField::NumSps => {
                for (q, mirror) in state.rmt_num_sps.iter_mut().enumerate() {
                    let Some(outbox) = partition.outbox(q) else { continue };
                    mirror
                        .par_iter_mut()
                        .enumerate()
                        .with_min_len(RAYON_MIN_LEN)
                        .for_each(|(slot, value)| *value = outbox.pull(slot));
                }
            }
        }
    }

    fn gather(&self, partition: &Partition, state: &mut BcState, _superstep: &Superstep) {
        let state = &*state;
        for inbox in partition.inboxes().iter().flatten() {
            inbox
                .rmt_nbrs()
                .par_iter()
                .enumerate()
                .with_min_len(RAYON_MIN_LEN)
                .for_each(|(slot, &vid)| {
                    let vid = vid as usize;
                    let value = match self.field {
                        MirrorField::Distance => state.distance[vid].load(Ordering::Relaxed),
                        MirrorField::NumSps => state.num_sps[vid].load(Ordering::Relaxed),
                    };
                    inbox.stage_pull(slot, value);
                });
        }
    }
}

/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-neighbor-partition message buffers.
//!
//! For every ordered pair of partitions (*p*, *q*) with at least one arc
//! from *p* into *q*, the [builder](crate::builder::PartitionedGraphBuilder)
//! creates two [`Mailbox`]es with identical slot order: an *outbox* owned by
//! *p* and an *inbox* owned by *q*. Each slot stands for one distinct
//! boundary vertex of *q* that *p* may touch; [`Mailbox::remote_vid`] maps a
//! slot to the owner-side local vid. This indirection is the fabric's only
//! global knowledge.
//!
//! Each mailbox carries two value buffers:
//!
//! - *push values*, accumulated by the owning partition's kernel and flushed
//!   into the paired inbox at the superstep boundary;
//! - *pull values*, staged on the owning side during the gather hook and
//!   transferred back to the paired outbox at the superstep boundary.
//!
//! Buffer elements are raw 32-bit words; the algorithm chooses the
//! interpretation per round (path counts and levels as `u32`, dependencies
//! as `f32` bits).

use std::sync::atomic::{AtomicU32, Ordering};

/// A boundary-vertex message buffer for one remote partition.
pub struct Mailbox {
    rmt_nbrs: Box<[u32]>,
    push_values: Box<[AtomicU32]>,
    pull_values: Box<[AtomicU32]>,
}

impl Mailbox {
    /// Creates a mailbox over the given slot→remote-vid map, with zeroed
    /// value buffers.
    pub fn new(rmt_nbrs: Box<[u32]>) -> Self {
        let count = rmt_nbrs.len();
        Self {
            rmt_nbrs,
            push_values: (0..count).map(|_| AtomicU32::new(0)).collect(),
            pull_values: (0..count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Returns the number of boundary vertices this mailbox covers.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rmt_nbrs.len()
    }

    /// Returns whether the mailbox covers no boundary vertices.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rmt_nbrs.is_empty()
    }

    /// Returns the owner-side local vid represented by a slot.
    #[inline(always)]
    pub fn remote_vid(&self, slot: usize) -> usize {
        self.rmt_nbrs[slot] as usize
    }

    /// Returns the slot→remote-vid map.
    #[inline(always)]
    pub fn rmt_nbrs(&self) -> &[u32] {
        &self.rmt_nbrs
    }

    /// Returns the push-value buffer.
    #[inline(always)]
    pub fn push_values(&self) -> &[AtomicU32] {
        &self.push_values
    }

    /// Returns the pull-value buffer.
    #[inline(always)]
    pub fn pull_values(&self) -> &[AtomicU32] {
        &self.pull_values
    }

    /// Accumulates into a push slot.
    #[inline(always)]
    pub fn push_add(&self, slot: usize, value: u32) {
        self.push_values[slot].fetch_add(value, Ordering::Relaxed);
    }

    /// Stages a `u32` pull value.
    #[inline(always)]
    pub fn stage_pull(&self, slot: usize, value: u32) {
        self.pull_values[slot].store(value, Ordering::Relaxed);
    }

    /// Stages an `f32` pull value as raw bits.
    #[inline(always)]
    pub fn stage_pull_f32(&self, slot: usize, value: f32) {
        self.pull_values[slot].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reads a pull slot as `u32`.
    #[inline(always)]
    pub fn pull(&self, slot: usize) -> u32 {
        self.pull_values[slot].load(Ordering::Relaxed)
    }

    /// Reads a pull slot as `f32`.
    #[inline(always)]
    pub fn pull_f32(&self, slot: usize) -> f32 {
        f32::from_bits(self.pull_values[slot].load(Ordering::Relaxed))
    }

    /// Zeroes the push-value buffer.
    pub fn clear_push(&self) {
        for value in self.push_values.iter() {
            value.store(0, Ordering::Relaxed);
        }
    }
}

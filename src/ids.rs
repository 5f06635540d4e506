/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Composite vertex identifiers and engine-wide constants.
//!
//! A global vertex identifier packs a partition id in its high
//! [`PARTITION_BITS`] bits and a local index in the remaining low bits, so
//! edge arrays can store cross-partition endpoints that are decoded with two
//! bit operations. For a remote endpoint the local index is the *mailbox
//! slot* assigned to that boundary vertex by the
//! [builder](crate::builder::PartitionedGraphBuilder), not the owner-side
//! vid; the mailbox's slot map recovers the latter.

/// An encoded (partition id, local index) pair.
pub type Eid = u64;

/// A BFS level.
pub type Cost = u32;

/// Number of high bits of an [`Eid`] holding the partition id.
pub const PARTITION_BITS: u32 = 6;

/// Number of low bits of an [`Eid`] holding the local index.
pub const LOCAL_BITS: u32 = Eid::BITS - PARTITION_BITS;

/// Maximum number of partitions a single graph may have.
pub const MAX_PARTITION_COUNT: usize = 1 << PARTITION_BITS;

/// Sentinel level of an unreached vertex.
pub const INF_COST: Cost = Cost::MAX;

/// Sentinel epsilon requesting exact betweenness.
pub const CENTRALITY_EXACT: f32 = 0.0;

/// Warp width of the medium virtual-warp kernels.
pub const VWARP_MEDIUM_WARP_WIDTH: usize = 16;

/// Vertices per virtual-warp batch in the medium kernels.
pub const VWARP_MEDIUM_BATCH_SIZE: usize = 32;

/// Threads per block of the data-parallel worker; block-wide kernels use
/// this as their warp width.
pub const MAX_THREADS_PER_BLOCK: usize = 256;

const LOCAL_MASK: Eid = (1 << LOCAL_BITS) - 1;

/// Encodes a partition id and a local index into an [`Eid`].
#[inline(always)]
pub fn encode(partition: usize, local: usize) -> Eid {
    debug_assert!(partition < MAX_PARTITION_COUNT);
    debug_assert!((local as Eid) <= LOCAL_MASK);
    ((partition as Eid) << LOCAL_BITS) | local as Eid
}

/// Returns the partition id of an encoded identifier.
#[inline(always)]
pub fn partition_id(id: Eid) -> usize {
    (id >> LOCAL_BITS) as usize
}

/// Returns the local index of an encoded identifier.
#[inline(always)]
pub fn local_id(id: Eid) -> usize {
    (id & LOCAL_MASK) as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for partition in [0, 1, 5, MAX_PARTITION_COUNT - 1] {
            for local in [0, 1, 1000, (1 << 40) + 3] {
                let id = encode(partition, local);
                assert_eq!(partition_id(id), partition);
                assert_eq!(local_id(id), local);
            }
        }
    }
}

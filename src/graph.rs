/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Read-only partitioned graphs.
//!
//! A [`PartitionedGraph`] is a set of [`Partition`]s, each holding a CSR
//! subgraph whose edge endpoints are [encoded](crate::ids::encode)
//! composite identifiers, a map from local vids back to the original
//! engine-wide ids, and the paired mailboxes covering its boundary
//! vertices. Partitions are read-only throughout a computation: all mutable
//! algorithm state lives beside them, and all cross-partition data flows
//! through the mailboxes.

use crate::ids::Eid;
use crate::mailbox::Mailbox;

/// The processor kind executing a partition's hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    /// A shared-memory worker pool parallelizing the outer vertex loop.
    Cpu,
    /// A data-parallel worker running frontier-based, warp-granular
    /// kernels.
    Accelerator,
}

/// How the vertex set was split across partitions.
///
/// The tag is retained on the graph because it selects the virtual-warp
/// width of the accelerator kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Vertices dealt in (seeded) random order.
    Random,
    /// Vertices dealt in decreasing degree order.
    HighDegree,
    /// Vertices dealt in increasing degree order.
    LowDegree,
}

/// A compressed-sparse-row subgraph with encoded neighbor identifiers.
pub struct CsrSubgraph {
    pub(crate) offsets: Box<[usize]>,
    pub(crate) edges: Box<[Eid]>,
    pub(crate) map: Box<[usize]>,
}

impl CsrSubgraph {
    /// Returns the number of local vertices.
    #[inline(always)]
    pub fn num_vertices(&self) -> usize {
        self.map.len()
    }

    /// Returns the number of local edges.
    #[inline(always)]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Returns the encoded neighbors of a local vertex.
    #[inline(always)]
    pub fn neighbors(&self, v: usize) -> &[Eid] {
        &self.edges[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Returns the original engine-wide id of a local vertex.
    #[inline(always)]
    pub fn original_id(&self, v: usize) -> usize {
        self.map[v]
    }
}

/// One partition of a [`PartitionedGraph`].
pub struct Partition {
    pub(crate) id: usize,
    pub(crate) processor: Processor,
    pub(crate) subgraph: CsrSubgraph,
    /// Outboxes indexed by remote partition id; `None` where no arc leaves
    /// this partition toward that remote.
    pub(crate) outbox: Box<[Option<Mailbox>]>,
    /// Inboxes indexed by remote partition id; `None` where no arc of that
    /// remote enters this partition.
    pub(crate) inbox: Box<[Option<Mailbox>]>,
}

impl Partition {
    /// Returns this partition's id.
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the processor kind executing this partition.
    #[inline(always)]
    pub fn processor(&self) -> Processor {
        self.processor
    }

    /// Returns the CSR subgraph.
    #[inline(always)]
    pub fn subgraph(&self) -> &CsrSubgraph {
        &self.subgraph
    }

    /// Returns the outbox toward a remote partition, if any.
    #[inline(always)]
    pub fn outbox(&self, to: usize) -> Option<&Mailbox> {
        self.outbox[to].as_ref()
    }

    /// Returns the inbox from a remote partition, if any.
    #[inline(always)]
    pub fn inbox(&self, from: usize) -> Option<&Mailbox> {
        self.inbox[from].as_ref()
    }

    /// Returns the outboxes, indexed by remote partition id.
    #[inline(always)]
    pub fn outboxes(&self) -> &[Option<Mailbox>] {
        &self.outbox
    }

    /// Returns the inboxes, indexed by remote partition id.
    #[inline(always)]
    pub fn inboxes(&self) -> &[Option<Mailbox>] {
        &self.inbox
    }
}

/// A graph split across partitions.
pub struct PartitionedGraph {
    pub(crate) partitions: Box<[Partition]>,
    pub(crate) owner: Box<[Eid]>,
    pub(crate) num_arcs: u64,
    pub(crate) strategy: PartitionStrategy,
}

impl PartitionedGraph {
    /// Returns the total number of vertices.
    #[inline(always)]
    pub fn num_vertices(&self) -> usize {
        self.owner.len()
    }

    /// Returns the total number of arcs.
    #[inline(always)]
    pub fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    /// Returns the number of partitions.
    #[inline(always)]
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Returns the partitions.
    #[inline(always)]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Returns the (partition id, local vid) pair owning an engine-wide
    /// vertex id.
    #[inline(always)]
    pub fn owner_of(&self, vertex: usize) -> (usize, usize) {
        let id = self.owner[vertex];
        (crate::ids::partition_id(id), crate::ids::local_id(id))
    }

    /// Returns the partitioning strategy the graph was built with.
    #[inline(always)]
    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }
}

/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Betweenness centrality over partitioned graphs.
//!
//! An implementation of the algorithm described by Ulrik Brandes in "[A
//! faster algorithm for betweenness centrality][Brandes]", _Journal of
//! Mathematical Sociology_, 25(2):163–177, 2001, run as a two-phase state
//! machine on the bulk-synchronous [engine](crate::engine).
//!
//! For each source vertex the driver executes four rounds:
//!
//! 1. a [push](crate::engine::Direction::Push) *forward* round — a
//!    level-synchronous BFS that computes levels together with
//!    shortest-path counts;
//! 2. two [pull](crate::engine::Direction::Pull) *mirror-synchronization*
//!    rounds installing the authoritative boundary levels and path counts
//!    on every partition;
//! 3. a pull *backward* round accumulating Brandes' dependencies into the
//!    per-partition betweenness arrays, and, on the last source,
//!    aggregating them into the output scores.
//!
//! # Approximation
//!
//! With an accuracy ε, only ⌈log₂ *V* / ε²⌉ sources are visited, drawn
//! uniformly without replacement, and scores are scaled by the sampling
//! ratio — the adaptive-sampling scheme of Bader et al. restricted to a
//! fixed sample size. The engine counts ordered source–target pairs and
//! never divides by two; for undirected (symmetrized) graphs the
//! conventional values are half of what it reports.
//!
//! [Brandes]: <https://doi.org/10.1080/0022250X.2001.9990249>

mod backward;
mod forward;
mod state;
mod sync;
pub mod seq;

use crate::engine::Engine;
use crate::graph::{PartitionStrategy, PartitionedGraph};
use crate::ids::{
    CENTRALITY_EXACT, MAX_THREADS_PER_BLOCK, VWARP_MEDIUM_BATCH_SIZE, VWARP_MEDIUM_WARP_WIDTH,
};
use anyhow::{ensure, Result};
use backward::BackwardRound;
use dsi_progress_logger::{no_logging, ProgressLog};
use forward::ForwardRound;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use state::BcState;
use sync::MirrorSync;
use sync_cell_slice::SyncSlice;

pub(crate) const RAYON_MIN_LEN: usize = 1 << 12;
pub(crate) const NODE_GRANULARITY: usize = 128;

/// Returns the (warp width, batch size) of the accelerator kernels for a
/// partitioning strategy.
///
/// Leaf-heavy deals get block-wide warps; the other strategies use the
/// medium width, which keeps coalescing without letting high-degree
/// vertices dominate a warp.
pub(crate) fn warp_params(strategy: PartitionStrategy) -> (usize, usize) {
    match strategy {
        PartitionStrategy::Random | PartitionStrategy::HighDegree => {
            (VWARP_MEDIUM_WARP_WIDTH, VWARP_MEDIUM_BATCH_SIZE)
        }
        PartitionStrategy::LowDegree => (MAX_THREADS_PER_BLOCK, MAX_THREADS_PER_BLOCK),
    }
}

/// Computes betweenness centrality over a partitioned graph.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run); the scores are then available via
/// [`scores`](Self::scores).
///
/// # Examples
///
/// ```
/// use bspgraph::{Betweenness, PartitionedGraphBuilder};
///
/// // The path 0 – 1 – 2, stored symmetrically.
/// let graph = PartitionedGraphBuilder::new(3)
///     .arcs([(0, 1), (1, 0), (1, 2), (2, 1)])
///     .num_partitions(2)
///     .build()
///     .unwrap();
///
/// let mut bc = Betweenness::new(&graph);
/// bc.run().unwrap();
/// assert_eq!(bc.scores(), &[0.0, 2.0, 0.0]);
/// ```
pub struct Betweenness<'a> {
    graph: &'a PartitionedGraph,
    epsilon: Option<f32>,
    seed: u64,
    scores: Box<[f32]>,
    num_samples: usize,
}

impl<'a> Betweenness<'a> {
    /// Creates a new computation over a graph, in exact mode.
    pub fn new(graph: &'a PartitionedGraph) -> Self {
        Self {
            graph,
            epsilon: None,
            seed: 0,
            scores: vec![0.0; graph.num_vertices()].into_boxed_slice(),
            num_samples: 0,
        }
    }

    /// Sets the accuracy of the computation.
    ///
    /// `None` or [`Some(CENTRALITY_EXACT)`](CENTRALITY_EXACT) request exact
    /// betweenness; a positive value selects the sampled approximation.
    ///
    /// # Panics
    ///
    /// Panics if the accuracy is negative or not finite.
    pub fn epsilon(&mut self, epsilon: Option<f32>) -> &mut Self {
        if let Some(epsilon) = epsilon {
            assert!(
                epsilon.is_finite() && epsilon >= 0.0,
                "The accuracy must be nonnegative, got {epsilon}"
            );
        }
        self.epsilon = epsilon;
        self
    }

    /// Sets the seed used to draw sources in sampled mode.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Returns the betweenness scores, indexed by engine-wide vertex id.
    ///
    /// After calling [`run`](Self::run), this contains the computed
    /// values.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Returns the number of sources visited by the last call to
    /// [`run`](Self::run).
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Runs the computation.
    pub fn run(&mut self) -> Result<()> {
        self.run_with_logging(no_logging![])
    }

    /// Runs the computation, logging progress.
    ///
    /// `pl` counts sources; pass `no_logging![]` to silence it.
    pub fn run_with_logging(&mut self, pl: &mut impl ProgressLog) -> Result<()> {
        let graph = self.graph;
        let num_vertices = graph.num_vertices();
        self.scores.fill(0.0);
        self.num_samples = 0;

        if num_vertices <= 1 || graph.num_arcs() == 0 {
            return Ok(());
        }

        let exact = match self.epsilon {
            None => true,
            Some(epsilon) => epsilon == CENTRALITY_EXACT,
        };
        let sources = if exact {
            (0..num_vertices).collect::<Vec<_>>()
        } else {
            let epsilon = self.epsilon.unwrap() as f64;
            let num_samples = (((num_vertices as f64).log2() / (epsilon * epsilon)).ceil()
                as usize)
                .clamp(1, num_vertices);
            rand::seq::index::sample(
                &mut SmallRng::seed_from_u64(self.seed),
                num_vertices,
                num_samples,
            )
            .into_vec()
        };
        self.num_samples = sources.len();
        let scale = if exact {
            1.0
        } else {
            num_vertices as f32 / sources.len() as f32
        };

        log::info!(
            "Mode: {}",
            if exact {
                "exact".to_string()
            } else {
                format!(
                    "approximate (epsilon = {}, {} samples)",
                    self.epsilon.unwrap(),
                    sources.len()
                )
            }
        );
        log::info!(
            "Partitions: {} ({:?} deal)",
            graph.num_partitions(),
            graph.strategy()
        );

        let mut engine = Engine::new(graph);
        let mut states = graph
            .partitions()
            .iter()
            .map(BcState::new)
            .collect::<Vec<_>>();
        let distance_sync = MirrorSync::distance();
        let num_sps_sync = MirrorSync::num_sps();
        let scores_sync = self.scores.as_sync_slice();

        pl.item_name("source");
        pl.expected_updates(Some(sources.len()));
        pl.start(format!(
            "Computing betweenness from {} sources...",
            sources.len()
        ));

        for (i, &source) in sources.iter().enumerate() {
            engine.execute(
                &ForwardRound {
                    source: graph.owner_of(source),
                    strategy: graph.strategy(),
                },
                &mut states,
            );
            engine.execute(&distance_sync, &mut states);
            engine.execute(&num_sps_sync, &mut states);
            engine.execute(
                &BackwardRound {
                    strategy: graph.strategy(),
                    last_source: i + 1 == sources.len(),
                    scale,
                    scores: scores_sync,
                },
                &mut states,
            );
            pl.light_update();
        }

        pl.done();
        Ok(())
    }
}

/// Computes betweenness centrality into a caller-allocated array.
///
/// `epsilon` follows the convention of [`Betweenness::epsilon`];
/// `scores` must have one entry per vertex. On a graph with no vertices
/// the (empty) array is left untouched.
pub fn betweenness(
    graph: &PartitionedGraph,
    epsilon: Option<f32>,
    scores: &mut [f32],
) -> Result<()> {
    ensure!(
        scores.len() == graph.num_vertices(),
        "The output array length ({}) does not match the number of vertices ({})",
        scores.len(),
        graph.num_vertices()
    );
    let mut bc = Betweenness::new(graph);
    bc.epsilon(epsilon);
    bc.run()?;
    scores.copy_from_slice(bc.scores());
    Ok(())
}

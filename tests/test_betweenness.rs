/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use bspgraph::centrality::seq::betweenness_seq;
use bspgraph::{
    betweenness, Betweenness, PartitionStrategy, PartitionedGraph, PartitionedGraphBuilder,
    Processor,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Stores an undirected edge list symmetrically.
fn sym(edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    edges
        .iter()
        .flat_map(|&(u, v)| [(u, v), (v, u)])
        .collect()
}

fn build(
    num_vertices: usize,
    arcs: &[(usize, usize)],
    num_partitions: usize,
    strategy: PartitionStrategy,
    processors: &[Processor],
) -> Result<PartitionedGraph> {
    let mut builder = PartitionedGraphBuilder::new(num_vertices);
    builder
        .arcs(arcs.iter().copied())
        .num_partitions(num_partitions)
        .strategy(strategy)
        .seed(42);
    if !processors.is_empty() {
        builder.processors(processors.to_vec());
    }
    builder.build()
}

fn run_exact(graph: &PartitionedGraph) -> Result<Vec<f32>> {
    let mut bc = Betweenness::new(graph);
    bc.run()?;
    Ok(bc.scores().to_vec())
}

/// Asserts engine scores match the oracle within a tolerance scaled by the
/// largest oracle value.
fn assert_close(actual: &[f32], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    let max = expected.iter().fold(1.0f64, |max, &x| max.max(x.abs()));
    for (v, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a as f64 - e).abs() <= 1E-4 * max,
            "vertex {v}: got {a}, expected {e}"
        );
    }
}

/// A seeded random symmetric graph with `num_edges` undirected edges.
fn random_graph(num_vertices: usize, num_edges: usize, seed: u64) -> Vec<(usize, usize)> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut edges = BTreeSet::new();
    while edges.len() < num_edges {
        let u = rng.random_range(0..num_vertices);
        let v = rng.random_range(0..num_vertices);
        if u != v {
            edges.insert((u.min(v), u.max(v)));
        }
    }
    sym(&edges.into_iter().collect::<Vec<_>>())
}

const PATH: &[(usize, usize)] = &[(0, 1), (1, 2), (2, 3), (3, 4)];

/// The same assertions over one partitioning configuration, in the manner
/// of the visit-test batteries.
macro_rules! test_equivalence {
    ($name:ident, $num_partitions:expr, $strategy:expr, $processors:expr) => {
        mod $name {
            use super::*;

            #[test]
            fn test_path() -> Result<()> {
                let arcs = sym(PATH);
                let graph = build(5, &arcs, $num_partitions, $strategy, $processors)?;
                assert_close(&run_exact(&graph)?, &betweenness_seq(5, &arcs));
                Ok(())
            }

            #[test]
            fn test_directed_diamond() -> Result<()> {
                // Two shortest paths 0 → 3, none back.
                let arcs = [(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)];
                let graph = build(5, &arcs, $num_partitions, $strategy, $processors)?;
                assert_close(&run_exact(&graph)?, &betweenness_seq(5, &arcs));
                Ok(())
            }

            #[test]
            fn test_random_graph() -> Result<()> {
                init_log();
                let arcs = random_graph(50, 120, 7);
                let graph = build(50, &arcs, $num_partitions, $strategy, $processors)?;
                let scores = run_exact(&graph)?;
                assert!(scores.iter().all(|&score| score >= 0.0));
                assert_close(&scores, &betweenness_seq(50, &arcs));
                Ok(())
            }

            #[test]
            fn test_random_sparse_graph() -> Result<()> {
                let arcs = random_graph(80, 90, 3);
                let graph = build(80, &arcs, $num_partitions, $strategy, $processors)?;
                assert_close(&run_exact(&graph)?, &betweenness_seq(80, &arcs));
                Ok(())
            }
        }
    };
}

use bspgraph::Processor::{Accelerator, Cpu};

test_equivalence!(single_cpu, 1, PartitionStrategy::Random, &[Cpu]);
test_equivalence!(single_accelerator, 1, PartitionStrategy::Random, &[Accelerator]);
test_equivalence!(two_cpu_random, 2, PartitionStrategy::Random, &[Cpu, Cpu]);
test_equivalence!(
    two_mixed_random,
    2,
    PartitionStrategy::Random,
    &[Cpu, Accelerator]
);
test_equivalence!(
    two_accelerator_high,
    2,
    PartitionStrategy::HighDegree,
    &[Accelerator, Accelerator]
);
test_equivalence!(
    three_mixed_low,
    3,
    PartitionStrategy::LowDegree,
    &[Accelerator, Cpu, Accelerator]
);
test_equivalence!(
    four_mixed_high,
    4,
    PartitionStrategy::HighDegree,
    &[Cpu, Accelerator, Cpu, Accelerator]
);

#[test]
fn test_path_oracle() -> Result<()> {
    // Halved, the path 1–2–3–4–5 has values [0, 3, 4, 3, 0].
    let graph = build(
        5,
        &sym(PATH),
        2,
        PartitionStrategy::Random,
        &[Cpu, Accelerator],
    )?;
    let scores = run_exact(&graph)?;
    let halved = scores.iter().map(|&score| score / 2.0).collect::<Vec<_>>();
    assert_eq!(halved, [0.0, 3.0, 4.0, 3.0, 0.0]);
    Ok(())
}

#[test]
fn test_star_oracle() -> Result<()> {
    let arcs = sym(&[(0, 1), (0, 2), (0, 3), (0, 4)]);
    let graph = build(5, &arcs, 2, PartitionStrategy::HighDegree, &[Cpu, Cpu])?;
    let scores = run_exact(&graph)?;
    let halved = scores.iter().map(|&score| score / 2.0).collect::<Vec<_>>();
    assert_eq!(halved, [6.0, 0.0, 0.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_triangle() -> Result<()> {
    let arcs = sym(&[(0, 1), (1, 2), (2, 0)]);
    for num_partitions in [1, 2, 3] {
        let graph = build(3, &arcs, num_partitions, PartitionStrategy::Random, &[])?;
        assert_eq!(run_exact(&graph)?, [0.0, 0.0, 0.0]);
    }
    Ok(())
}

#[test]
fn test_disconnected_components() -> Result<()> {
    // Two 3-paths; each component scores as it would in isolation.
    let arcs = sym(&[(0, 1), (1, 2), (3, 4), (4, 5)]);
    let graph = build(6, &arcs, 3, PartitionStrategy::Random, &[])?;
    assert_eq!(run_exact(&graph)?, [0.0, 2.0, 0.0, 0.0, 2.0, 0.0]);
    Ok(())
}

#[test]
fn test_empty_graph() -> Result<()> {
    let graph = PartitionedGraphBuilder::new(0).build()?;
    let mut scores = [];
    betweenness(&graph, None, &mut scores)?;
    Ok(())
}

#[test]
fn test_single_vertex() -> Result<()> {
    let graph = PartitionedGraphBuilder::new(1).build()?;
    let mut scores = [f32::NAN];
    betweenness(&graph, None, &mut scores)?;
    assert_eq!(scores, [0.0]);
    Ok(())
}

#[test]
fn test_edgeless_graph() -> Result<()> {
    let graph = PartitionedGraphBuilder::new(5).num_partitions(2).build()?;
    let mut scores = [f32::NAN; 5];
    betweenness(&graph, None, &mut scores)?;
    assert_eq!(scores, [0.0; 5]);
    Ok(())
}

#[test]
fn test_output_length_mismatch() -> Result<()> {
    let graph = PartitionedGraphBuilder::new(3).build()?;
    let mut scores = [0.0; 2];
    assert!(betweenness(&graph, None, &mut scores).is_err());
    Ok(())
}

#[test]
fn test_deterministic_runs() -> Result<()> {
    let arcs = random_graph(40, 100, 11);
    let graph = build(
        40,
        &arcs,
        3,
        PartitionStrategy::HighDegree,
        &[Accelerator, Cpu, Cpu],
    )?;
    let first = run_exact(&graph)?;
    let second = run_exact(&graph)?;
    let bits = |scores: &[f32]| scores.iter().map(|score| score.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
    Ok(())
}

#[test]
fn test_approximate_saturated_sampling() -> Result<()> {
    // At this accuracy the sample size clamps to the vertex count, so the
    // sampled estimator coincides with the exact scores.
    let arcs = random_graph(100, 300, 5);
    let graph = build(100, &arcs, 2, PartitionStrategy::Random, &[Cpu, Accelerator])?;
    let mut bc = Betweenness::new(&graph);
    bc.epsilon(Some(0.1)).seed(3);
    bc.run()?;
    assert_eq!(bc.num_samples(), 100);
    assert_close(bc.scores(), &betweenness_seq(100, &arcs));
    Ok(())
}

#[test]
fn test_approximate_percentile_error() -> Result<()> {
    init_log();
    let arcs = random_graph(500, 2000, 9);
    let graph = build(500, &arcs, 3, PartitionStrategy::Random, &[Cpu, Cpu, Accelerator])?;
    let mut bc = Betweenness::new(&graph);
    bc.epsilon(Some(0.1)).seed(1);
    bc.run()?;
    let exact = betweenness_seq(500, &arcs);
    let mut relative_errors = bc
        .scores()
        .iter()
        .zip(exact.iter())
        .map(|(&approx, &exact)| (approx as f64 - exact).abs() / exact.max(1.0))
        .collect::<Vec<_>>();
    relative_errors.sort_by(f64::total_cmp);
    assert!(relative_errors[relative_errors.len() * 9 / 10] <= 0.15);
    Ok(())
}

#[test]
fn test_approximate_scaled_mass() -> Result<()> {
    // The scaled total dependency mass should estimate the exact one.
    let arcs = random_graph(60, 240, 13);
    let graph = build(60, &arcs, 2, PartitionStrategy::LowDegree, &[Cpu, Cpu])?;
    let exact_mass = betweenness_seq(60, &arcs).iter().sum::<f64>();
    let mut mass = 0.0;
    for seed in 0..5 {
        let mut bc = Betweenness::new(&graph);
        bc.epsilon(Some(0.5)).seed(seed);
        bc.run()?;
        assert!(bc.num_samples() < 60);
        assert!(bc.scores().iter().all(|&score| score >= 0.0));
        mass += bc.scores().iter().map(|&score| score as f64).sum::<f64>();
    }
    mass /= 5.0;
    assert!(
        mass >= exact_mass * 0.5 && mass <= exact_mass * 2.0,
        "scaled mass {mass} too far from exact {exact_mass}"
    );
    Ok(())
}

#[test]
fn test_seeding_invariants() -> Result<()> {
    // On a reached graph every vertex has a positive score only by
    // accumulating dependencies of actual intermediaries: endpoints of a
    // path never gain score, and the source side is exercised from every
    // partition placement.
    for strategy in [
        PartitionStrategy::Random,
        PartitionStrategy::HighDegree,
        PartitionStrategy::LowDegree,
    ] {
        let graph = build(5, &sym(PATH), 4, strategy, &[])?;
        let scores = run_exact(&graph)?;
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[4], 0.0);
        assert!(scores[1] > 0.0 && scores[2] > 0.0 && scores[3] > 0.0);
    }
    Ok(())
}

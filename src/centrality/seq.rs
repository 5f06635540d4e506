/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Sequential reference implementation of Brandes' algorithm.

use std::collections::VecDeque;

/// Computes exact betweenness centrality single-threadedly.
///
/// This is the textbook algorithm: one BFS per source recording levels and
/// path counts, followed by a dependency accumulation over the vertices in
/// reverse visit order. It counts ordered source–target pairs, like the
/// partitioned engine, and is meant as an oracle for testing and for
/// graphs small enough not to warrant partitioning.
pub fn betweenness_seq(num_vertices: usize, arcs: &[(usize, usize)]) -> Box<[f64]> {
    let mut successors = vec![Vec::new(); num_vertices];
    for &(u, v) in arcs {
        successors[u].push(v);
    }

    let mut scores = vec![0.0; num_vertices];
    let mut order = Vec::with_capacity(num_vertices);
    let mut queue = VecDeque::new();

    for source in 0..num_vertices {
        let mut distance = vec![usize::MAX; num_vertices];
        let mut sigma = vec![0.0; num_vertices];
        order.clear();
        distance[source] = 0;
        sigma[source] = 1.0;
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            order.push(u);
            for &v in &successors[u] {
                if distance[v] == usize::MAX {
                    distance[v] = distance[u] + 1;
                    queue.push_back(v);
                }
                if distance[v] == distance[u] + 1 {
                    sigma[v] += sigma[u];
                }
            }
        }

        let mut delta = vec![0.0; num_vertices];
        for &u in order.iter().rev() {
            for &v in &successors[u] {
                if distance[v] == distance[u] + 1 {
                    delta[u] += sigma[u] / sigma[v] * (1.0 + delta[v]);
                }
            }
            if u != source {
                scores[u] += delta[u];
            }
        }
    }

    scores.into_boxed_slice()
}

//! Community detection: single-level greedy modularity optimization (the
//! local-moving phase of Louvain, without the recursive graph-of-communities
//! aggregation step), plus adaptive resolution tuning.
//!
//! No graph-algorithm crate in the dependency stack exposes Louvain, so this
//! is hand-rolled. The adaptive wrapper binary-searches the resolution
//! parameter to land the community count inside a target band.

use std::collections::HashMap;

use crate::chunk::Chunk;
use crate::config::EngineConfig;
use crate::graph::{Community, KnowledgeGraph};

struct ModularityGraph<'a> {
    graph: &'a KnowledgeGraph,
    total_weight: f64,
}

impl<'a> ModularityGraph<'a> {
    fn new(graph: &'a KnowledgeGraph) -> Self {
        let total_weight: f64 = graph.edges.iter().map(|e| e.weight as f64).sum();
        Self { graph, total_weight }
    }

    fn node_weight(&self, node: u32) -> f64 {
        self.graph
            .neighbors(node)
            .map(|(_, edge)| edge.weight as f64)
            .sum()
    }
}

/// Runs local-moving modularity optimization at a fixed resolution and
/// returns a `[community_id; node_count]` assignment (ids compacted to a
/// dense `0..k` range).
fn louvain_local_moving(graph: &KnowledgeGraph, resolution: f64) -> Vec<u32> {
    let n = graph.node_count;
    if n == 0 {
        return Vec::new();
    }
    let mg = ModularityGraph::new(graph);
    let m2 = (2.0 * mg.total_weight).max(1e-9);

    let mut community: Vec<u32> = (0..n as u32).collect();
    let mut community_weight: HashMap<u32, f64> =
        (0..n as u32).map(|i| (i, mg.node_weight(i))).collect();

    let mut improved = true;
    let mut pass = 0;
    while improved && pass < 20 {
        improved = false;
        pass += 1;
        for node in 0..n as u32 {
            let current_comm = community[node as usize];
            let k_i = mg.node_weight(node);

            let mut neighbor_comm_weight: HashMap<u32, f64> = HashMap::new();
            for (neighbor, edge) in graph.neighbors(node) {
                if neighbor == node {
                    continue;
                }
                *neighbor_comm_weight
                    .entry(community[neighbor as usize])
                    .or_insert(0.0) += edge.weight as f64;
            }

            *community_weight.entry(current_comm).or_insert(0.0) -= k_i;

            let mut best_comm = current_comm;
            let mut best_gain = 0.0f64;
            for (&comm, &k_i_in) in &neighbor_comm_weight {
                let sigma_tot = *community_weight.get(&comm).unwrap_or(&0.0);
                let gain = k_i_in - resolution * sigma_tot * k_i / m2;
                if gain > best_gain {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            community[node as usize] = best_comm;
            *community_weight.entry(best_comm).or_insert(0.0) += k_i;

            if best_comm != current_comm {
                improved = true;
            }
        }
    }

    compact_ids(&community)
}

fn compact_ids(assignment: &[u32]) -> Vec<u32> {
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut next = 0u32;
    assignment
        .iter()
        .map(|&c| {
            *remap.entry(c).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}

fn community_count(assignment: &[u32]) -> usize {
    assignment.iter().copied().collect::<std::collections::HashSet<_>>().len()
}

/// Binary-searches `resolution` in `[min, max]` to bring the community count
/// into `[target_min, target_max]`, converging when the search interval
/// narrows below 0.01 or after `max_iterations` steps.
pub fn detect_communities_adaptive(graph: &KnowledgeGraph, config: &EngineConfig) -> Vec<u32> {
    if !config.adaptive_resolution {
        return louvain_local_moving(graph, config.louvain_resolution);
    }

    let mut low = config.louvain_min_resolution;
    let mut high = config.louvain_max_resolution;
    let mut best = louvain_local_moving(graph, config.louvain_resolution);

    for _ in 0..config.louvain_max_iterations {
        if (high - low) < 0.01 {
            break;
        }
        let mid = (low + high) / 2.0;
        let assignment = louvain_local_moving(graph, mid);
        let count = community_count(&assignment);
        best = assignment;

        if count < config.target_min_communities {
            // too few communities, need finer granularity: raise resolution
            low = mid;
        } else if count > config.target_max_communities {
            high = mid;
        } else {
            break;
        }
    }

    best
}

/// Builds `Community` records (distributions, dominants, density) from a raw
/// node-to-community assignment, dropping communities below the configured
/// minimum size.
pub fn build_communities(
    graph: &KnowledgeGraph,
    chunks: &[Chunk],
    assignment: &[u32],
    config: &EngineConfig,
) -> (Vec<u32>, Vec<Community>) {
    let mut members_by_comm: HashMap<u32, Vec<u32>> = HashMap::new();
    for (node, &comm) in assignment.iter().enumerate() {
        members_by_comm.entry(comm).or_default().push(node as u32);
    }

    let mut communities = Vec::new();
    let mut final_assignment = assignment.to_vec();
    let mut next_id = 0u32;

    let mut sorted_comms: Vec<_> = members_by_comm.into_iter().collect();
    sorted_comms.sort_by_key(|(id, _)| *id);

    for (_, members) in sorted_comms {
        if members.len() < config.min_community_size {
            for &node in &members {
                final_assignment[node as usize] = u32::MAX;
            }
            continue;
        }

        let mut category_distribution: HashMap<String, usize> = HashMap::new();
        let mut year_distribution: HashMap<i32, usize> = HashMap::new();
        for &node in &members {
            let chunk = &chunks[node as usize];
            *category_distribution.entry(chunk.category.clone()).or_insert(0) += 1;
            for &year in &chunk.years {
                *year_distribution.entry(year).or_insert(0) += 1;
            }
        }

        let dominant_category = category_distribution
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(cat, _)| cat.clone());

        let mut dominant_years: Vec<i32> = year_distribution
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(&year, _)| year)
            .collect();
        dominant_years.sort_unstable();

        let internal_edges = graph
            .edges
            .iter()
            .filter(|e| {
                final_assignment[e.source as usize] == next_id
                    || (members.contains(&e.source) && members.contains(&e.target))
            })
            .filter(|e| members.contains(&e.source) && members.contains(&e.target))
            .count();
        let max_possible = members.len() * members.len().saturating_sub(1) / 2;
        let density = if max_possible > 0 {
            internal_edges as f64 / max_possible as f64
        } else {
            0.0
        };

        for &node in &members {
            final_assignment[node as usize] = next_id;
        }

        communities.push(Community {
            id: next_id,
            members,
            dominant_category,
            dominant_years,
            category_distribution,
            year_distribution,
            density,
            hub_ids: Vec::new(),
            summary: None,
            content_hash: None,
        });
        next_id += 1;
    }

    (final_assignment, communities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, EdgeType};

    fn make_two_clique_graph() -> KnowledgeGraph {
        let mk = |source: u32, target: u32| Edge {
            source,
            target,
            edge_type: EdgeType::SameTopic,
            weight: 1.0,
            origin: crate::graph::EdgeOrigin::Knn,
            similarity: 1.0,
        };
        let edges = vec![
            mk(0, 1),
            mk(1, 2),
            mk(0, 2),
            mk(3, 4),
            mk(4, 5),
            mk(3, 5),
        ];
        KnowledgeGraph::new(6, edges)
    }

    #[test]
    fn louvain_separates_two_disjoint_cliques() {
        let graph = make_two_clique_graph();
        let assignment = louvain_local_moving(&graph, 1.0);
        assert_eq!(assignment[0], assignment[1]);
        assert_eq!(assignment[1], assignment[2]);
        assert_eq!(assignment[3], assignment[4]);
        assert_eq!(assignment[4], assignment[5]);
        assert_ne!(assignment[0], assignment[3]);
    }

    #[test]
    fn small_communities_are_dropped() {
        let graph = make_two_clique_graph();
        let mut config = EngineConfig::default();
        config.min_community_size = 10;
        let assignment = louvain_local_moving(&graph, 1.0);
        let chunks: Vec<Chunk> = (0..6)
            .map(|i| Chunk::new(format!("d{i}"), "text", "ideas", 0))
            .collect();
        let (_, communities) = build_communities(&graph, &chunks, &assignment, &config);
        assert!(communities.is_empty());
    }
}

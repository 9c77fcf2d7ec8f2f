use crate::{Network, VertexId};
use anyhow::{bail, Result};
use petgraph::algo::connected_components;
use std::collections::{HashSet, VecDeque};

/// Summary statistics produced by `network stats` (degree distribution and component counts).
#[derive(Debug)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub segment_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    /// Vertices with exactly one incident segment (cul-de-sacs, cut edges at the map border).
    pub dead_ends: usize,
}

/// One connected piece of the street network.
#[derive(Debug)]
pub struct IslandSummary {
    pub island_id: usize,
    pub vertex_count: usize,
}

/// Island label of a single vertex.
#[derive(Debug)]
pub struct VertexAssignment {
    pub vertex_id: VertexId,
    pub island_id: usize,
}

/// Aggregated island analysis result.
#[derive(Debug)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    pub assignments: Vec<VertexAssignment>,
}

impl IslandAnalysis {
    /// Island holding the most vertices, if any.
    pub fn largest(&self) -> Option<&IslandSummary> {
        self.islands.iter().max_by_key(|island| island.vertex_count)
    }
}

/// Degree and component statistics of the street graph.
pub fn graph_stats(network: &Network) -> Result<GraphStats> {
    let vertex_count = network.graph.node_count();
    let segment_count = network.graph.edge_count();
    if vertex_count != network.vertices().len() {
        bail!(
            "graph holds {vertex_count} nodes but the arena holds {} vertices",
            network.vertices().len()
        );
    }
    let degrees: Vec<usize> = network
        .graph
        .node_indices()
        .map(|node| network.graph.edges(node).count())
        .collect();
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if vertex_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / vertex_count as f64
    };
    let dead_ends = degrees.iter().filter(|degree| **degree == 1).count();
    Ok(GraphStats {
        vertex_count,
        segment_count,
        connected_components: connected_components(&network.graph),
        min_degree,
        avg_degree,
        max_degree,
        dead_ends,
    })
}

/// Labels connected components (breadth-first search) so disconnected street
/// islands can be reported. Assignments come back ordered by vertex id.
pub fn find_islands(network: &Network) -> Result<IslandAnalysis> {
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();
    let mut island_id = 0;
    for start in network.graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for neighbor in network.graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(IslandSummary {
            island_id,
            vertex_count: members.len(),
        });
        for node in members {
            assignments.push(VertexAssignment {
                vertex_id: network.graph[node],
                island_id,
            });
        }
        island_id += 1;
    }
    assignments.sort_by_key(|assignment| assignment.vertex_id);
    Ok(IslandAnalysis {
        islands,
        assignments,
    })
}

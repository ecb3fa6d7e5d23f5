//! Knowledge graph over chunks: typed edges, communities, and structural roles.
//!
//! The graph is built once after chunk ingestion and embedding, then held
//! read-only behind an `Arc` for the lifetime of the process — see
//! `pipeline.rs` for the construction order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::chunk::ChunkIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum EdgeType {
    Elaborates,
    Contradicts,
    Causes,
    Supports,
    TemporalSequence,
    CrossDomain,
    SameTopic,
    /// Adjacent ordinal position within the same document. Emitted
    /// unconditionally, independent of the kNN admission pass.
    Sequential,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Elaborates => "elaborates",
            EdgeType::Contradicts => "contradicts",
            EdgeType::Causes => "causes",
            EdgeType::Supports => "supports",
            EdgeType::TemporalSequence => "temporal_sequence",
            EdgeType::CrossDomain => "cross_domain",
            EdgeType::SameTopic => "same_topic",
            EdgeType::Sequential => "sequential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "elaborates" => Some(EdgeType::Elaborates),
            "contradicts" => Some(EdgeType::Contradicts),
            "causes" => Some(EdgeType::Causes),
            "supports" => Some(EdgeType::Supports),
            "temporal_sequence" => Some(EdgeType::TemporalSequence),
            "cross_domain" => Some(EdgeType::CrossDomain),
            "same_topic" => Some(EdgeType::SameTopic),
            "sequential" => Some(EdgeType::Sequential),
            _ => None,
        }
    }
}

/// How an edge was discovered: from the top-k similarity scan or from the
/// unconditional same-document adjacency pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum EdgeOrigin {
    Knn,
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: ChunkIndex,
    pub target: ChunkIndex,
    pub edge_type: EdgeType,
    pub weight: f32,
    pub origin: EdgeOrigin,
    /// Cosine similarity at discovery time, independent of `weight` (which
    /// may be a fixed constant for sequential edges).
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Regular,
    Hub,
    Bridge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub text: String,
    pub is_abstractive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: u32,
    pub members: Vec<ChunkIndex>,
    pub dominant_category: Option<String>,
    pub dominant_years: Vec<i32>,
    pub category_distribution: HashMap<String, usize>,
    pub year_distribution: HashMap<i32, usize>,
    pub density: f64,
    pub hub_ids: Vec<ChunkIndex>,
    pub summary: Option<CommunitySummary>,
    /// Content hash over (sorted member ids, text prefixes), used to
    /// invalidate a cached summary when membership or content changes.
    pub content_hash: Option<String>,
}

impl Community {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Adjacency-list knowledge graph over chunk indices. Construction (edge
/// typing, community detection, hub/bridge labeling) lives in `edges.rs`,
/// `community.rs`, and `hubs_bridges.rs`; this type is the immutable result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub node_count: usize,
    pub edges: Vec<Edge>,
    adjacency: Vec<Vec<u32>>, // edge indices per node, undirected view
    pub communities: Vec<Community>,
    pub node_community: Vec<u32>,
    pub node_role: Vec<NodeRole>,
    /// Bridge membership tracked independently of `node_role`: a node can
    /// satisfy the bridge criteria and still display as `Hub` (hub takes
    /// precedence for the single role tag), but the bridge list still
    /// includes it.
    pub node_is_bridge: Vec<bool>,
    pub node_betweenness: Vec<f64>,
    pub node_pagerank: Vec<f64>,
    pub node_degree: Vec<u32>,
}

impl KnowledgeGraph {
    pub fn new(node_count: usize, edges: Vec<Edge>) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        let mut node_degree = vec![0u32; node_count];
        for (idx, edge) in edges.iter().enumerate() {
            adjacency[edge.source as usize].push(idx as u32);
            adjacency[edge.target as usize].push(idx as u32);
            node_degree[edge.source as usize] += 1;
            node_degree[edge.target as usize] += 1;
        }
        Self {
            node_count,
            edges,
            adjacency,
            communities: Vec::new(),
            node_community: vec![0; node_count],
            node_role: vec![NodeRole::Regular; node_count],
            node_is_bridge: vec![false; node_count],
            node_betweenness: vec![0.0; node_count],
            node_pagerank: vec![0.0; node_count],
            node_degree,
        }
    }

    pub fn neighbors(&self, node: ChunkIndex) -> impl Iterator<Item = (ChunkIndex, &Edge)> + '_ {
        self.adjacency[node as usize].iter().map(move |&edge_idx| {
            let edge = &self.edges[edge_idx as usize];
            let other = if edge.source == node {
                edge.target
            } else {
                edge.source
            };
            (other, edge)
        })
    }

    pub fn neighbors_by_types(
        &self,
        node: ChunkIndex,
        types: &[EdgeType],
    ) -> Vec<(ChunkIndex, &Edge)> {
        self.neighbors(node)
            .filter(|(_, edge)| types.contains(&edge.edge_type))
            .collect()
    }

    pub fn degree(&self, node: ChunkIndex) -> u32 {
        self.node_degree[node as usize]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn community_of(&self, node: ChunkIndex) -> u32 {
        self.node_community[node as usize]
    }

    pub fn role_of(&self, node: ChunkIndex) -> NodeRole {
        self.node_role[node as usize]
    }

    pub fn is_bridge(&self, node: ChunkIndex) -> bool {
        self.node_is_bridge[node as usize]
    }

    pub fn set_communities(&mut self, assignment: Vec<u32>, communities: Vec<Community>) {
        self.node_community = assignment;
        self.communities = communities;
    }

    pub fn set_structural_roles(
        &mut self,
        roles: Vec<NodeRole>,
        is_bridge: Vec<bool>,
        betweenness: Vec<f64>,
    ) {
        self.node_role = roles;
        self.node_is_bridge = is_bridge;
        self.node_betweenness = betweenness;
    }

    pub fn set_pagerank(&mut self, pagerank: Vec<f64>) {
        self.node_pagerank = pagerank;
    }

    pub fn pagerank_of(&self, node: ChunkIndex) -> f64 {
        self.node_pagerank[node as usize]
    }
}

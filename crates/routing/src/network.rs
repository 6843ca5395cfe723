//! Weighted road graph and shortest-path search.
//!
//! The search is a plain Dijkstra over a binary min-heap with visit-once
//! semantics and per-edge back-pointers, so the traversed edge sequence can
//! be reconstructed even across parallel edges (dual carriageways and split
//! siblings produce several edges between the same pair of junctions).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::error::{Result, RoutingError};
use crate::types::{JunctionId, RoadEdge};

#[derive(Default)]
pub struct RoadNetwork {
    graph: UnGraph<JunctionId, RoadEdge>,
    junctions: HashMap<JunctionId, NodeIndex>,
}

/// A resolved shortest path. Edges are oriented in travel direction.
#[derive(Clone, Debug)]
pub struct PathResult {
    pub junctions: Vec<JunctionId>,
    pub edges: Vec<RoadEdge>,
    pub total_length: f64,
    pub total_cost: f64,
    pub total_weight: f64,
    /// Junctions settled by the search, for diagnostics.
    pub visited_junctions: usize,
}

struct HeapEntry {
    weight: f64,
    node: NodeIndex,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Reversed so the std max-heap pops the smallest accumulated weight.
    // Ties break on node index to keep the visit order deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(edges: impl IntoIterator<Item = RoadEdge>) -> Self {
        let mut network = Self::new();
        for edge in edges {
            network.add_edge(edge);
        }
        network
    }

    /// Insert an edge, creating its junctions as needed. Roads are
    /// traversable in both directions.
    pub fn add_edge(&mut self, edge: RoadEdge) {
        let from = self.junction_index(edge.from_junction);
        let to = self.junction_index(edge.to_junction);
        self.graph.add_edge(from, to, edge);
    }

    fn junction_index(&mut self, id: JunctionId) -> NodeIndex {
        if let Some(&index) = self.junctions.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id);
        self.junctions.insert(id, index);
        index
    }

    pub fn contains_junction(&self, id: JunctionId) -> bool {
        self.junctions.contains_key(&id)
    }

    pub fn junction_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Dijkstra from `start` to `end` under the supplied edge weight.
    /// Negative weights are treated as zero.
    pub fn shortest_path(
        &self,
        start: JunctionId,
        end: JunctionId,
        weight: &dyn Fn(&RoadEdge) -> f64,
    ) -> Result<PathResult> {
        let start_index = *self
            .junctions
            .get(&start)
            .ok_or(RoutingError::JunctionNotFound(start))?;
        let end_index = *self
            .junctions
            .get(&end)
            .ok_or(RoutingError::JunctionNotFound(end))?;

        let mut distance: HashMap<NodeIndex, f64> = HashMap::new();
        let mut previous: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
        let mut settled: HashMap<NodeIndex, bool> = HashMap::new();
        let mut heap = BinaryHeap::new();

        distance.insert(start_index, 0.0);
        heap.push(HeapEntry {
            weight: 0.0,
            node: start_index,
        });

        let mut visited = 0usize;
        while let Some(HeapEntry { weight: settled_weight, node }) = heap.pop() {
            if *settled.get(&node).unwrap_or(&false) {
                continue;
            }
            settled.insert(node, true);
            visited += 1;

            if node == end_index {
                break;
            }

            for edge in self.graph.edges(node) {
                let neighbor = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                if *settled.get(&neighbor).unwrap_or(&false) {
                    continue;
                }
                let step = weight(edge.weight()).max(0.0);
                let candidate = settled_weight + step;
                let better = distance
                    .get(&neighbor)
                    .map(|&current| candidate < current)
                    .unwrap_or(true);
                if better {
                    distance.insert(neighbor, candidate);
                    previous.insert(neighbor, (node, edge.id()));
                    heap.push(HeapEntry {
                        weight: candidate,
                        node: neighbor,
                    });
                }
            }
        }

        if !settled.get(&end_index).unwrap_or(&false) {
            return Err(RoutingError::NoRoute { from: start, to: end });
        }

        self.reconstruct(start_index, end_index, &distance, &previous, visited)
    }

    fn reconstruct(
        &self,
        start: NodeIndex,
        end: NodeIndex,
        distance: &HashMap<NodeIndex, f64>,
        previous: &HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
        visited: usize,
    ) -> Result<PathResult> {
        let mut junctions = vec![self.graph[end]];
        let mut edges = Vec::new();

        let mut cursor = end;
        while cursor != start {
            let &(parent, via) = previous
                .get(&cursor)
                .ok_or(RoutingError::JunctionNotFound(self.graph[cursor]))?;
            let edge = &self.graph[via];
            edges.push(edge.oriented_from(self.graph[parent]));
            junctions.push(self.graph[parent]);
            cursor = parent;
        }
        junctions.reverse();
        edges.reverse();

        let total_length = edges.iter().map(|e| e.length).sum();
        let total_cost = edges.iter().map(|e| e.cost).sum();
        let total_weight = *distance.get(&end).unwrap_or(&0.0);

        Ok(PathResult {
            junctions,
            edges,
            total_length,
            total_cost,
            total_weight,
            visited_junctions: visited,
        })
    }
}

//! Interference graph construction (§4.2 "Interference graph"): after
//! coalescing, assign dense ids to the remaining distinct nodes ordered by
//! live-range start, then connect any two nodes whose ranges overlap.
//!
//! The spec describes an O((V+E)·α) sweep that maintains an `active` list
//! pruned by end position. This builds the same graph with a plain O(n²)
//! pairwise scan over the (already coalesced, typically small per
//! function) node set — same result, simpler code; see DESIGN.md.

use hashbrown::HashMap;

use chrono_ir::TempId;

use crate::interval::Intervals;
use crate::union_find::UnionFind;

#[derive(Debug)]
pub struct InterferenceGraph {
    /// Dense interference-node id for each original temporary that survived
    /// dead-code elimination (several temporaries may share a node after
    /// coalescing).
    pub node_of_temp: HashMap<TempId, usize>,
    /// Adjacency: node -> interfering nodes.
    pub adjacency: Vec<Vec<usize>>,
    /// The merged live interval backing each node (same indexing as
    /// `adjacency`).
    pub intervals: Vec<Intervals>,
}

impl InterferenceGraph {
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn register_node(&self, temp: TempId) -> Option<usize> {
        self.node_of_temp.get(&temp).copied()
    }
}

/// Builds the interference graph from `coalesce`'s output. `all_temps`
/// should list every temporary that needs a register — i.e. every distinct
/// destination still present in the function after dead-code elimination.
pub fn build(
    mut uf: UnionFind,
    merged_intervals: HashMap<TempId, Intervals>,
    all_temps: &[TempId],
) -> InterferenceGraph {
    let mut roots: Vec<TempId> = merged_intervals.keys().copied().collect();
    roots.sort_by_key(|r| merged_intervals[r].start().unwrap_or(u32::MAX));

    let mut node_id: HashMap<TempId, usize> = HashMap::new();
    for (i, &root) in roots.iter().enumerate() {
        node_id.insert(root, i);
    }

    let mut node_of_temp = HashMap::new();
    for &t in all_temps {
        let root = uf.find(t);
        if let Some(&id) = node_id.get(&root) {
            node_of_temp.insert(t, id);
        }
    }

    let intervals: Vec<Intervals> = roots.iter().map(|r| merged_intervals[r].clone()).collect();
    let n = intervals.len();
    let mut adjacency = vec![Vec::new(); n];
    for i in 0..n {
        for j in 0..i {
            if intervals[i].overlaps(&intervals[j]) {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    InterferenceGraph { node_of_temp, adjacency, intervals }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_temps_become_adjacent_nodes() {
        let mut intervals = HashMap::new();
        let (a, b, c) = (TempId(0), TempId(1), TempId(2));
        let mut ia = Intervals::new();
        ia.extend(0, 10);
        let mut ib = Intervals::new();
        ib.extend(5, 15);
        let mut ic = Intervals::new();
        ic.extend(20, 30);
        intervals.insert(a, ia);
        intervals.insert(b, ib);
        intervals.insert(c, ic);

        let graph = build(UnionFind::new(), intervals, &[a, b, c]);
        assert_eq!(graph.node_count(), 3);
        let (na, nb, nc) = (graph.register_node(a).unwrap(), graph.register_node(b).unwrap(), graph.register_node(c).unwrap());
        assert!(graph.adjacency[na].contains(&nb));
        assert!(!graph.adjacency[na].contains(&nc));
    }
}

//! C6: register allocation over the chordal interference graph C5 builds —
//! maximum cardinality search ordering, then greedy coloring (§4.3).

use hashbrown::HashSet;

use chrono_ir::TempId;
use chrono_liveness::InterferenceGraph;

/// Runs MCS + greedy coloring over `graph`, returning the color (register
/// number) assigned to each dense interference node, indexed the same way
/// as `graph.adjacency`.
pub fn allocate(graph: &InterferenceGraph) -> Vec<u32> {
    let order = mcs_order(graph);
    greedy_color(graph, &order)
}

/// The register assigned to `temp`, or `0` if it was never seen by the
/// interference graph (e.g. a temp whose only use was optimized away but
/// whose id still appears somewhere stale — defensive, should not occur
/// for a correctly finalized function).
pub fn register_for(graph: &InterferenceGraph, colors: &[u32], temp: TempId) -> u32 {
    graph.register_node(temp).map(|n| colors[n]).unwrap_or(0)
}

/// §4.3 step 1: maximum cardinality search. The spec's bucket structure
/// (bucket[weight] = doubly-linked list, cursor at the highest non-empty
/// bucket) gives O(V+E); this picks the max-weight unordered node by a
/// linear scan each iteration, which is O(V²) but immaterial at the scale
/// of one function's temporaries, and yields the exact same elimination
/// ordering guarantee — ties broken arbitrarily, as the spec allows
/// ("pick any node from the highest non-empty bucket").
fn mcs_order(graph: &InterferenceGraph) -> Vec<usize> {
    let n = graph.node_count();
    let mut weight = vec![0u32; n];
    let mut ordered = vec![false; n];
    let mut order = Vec::with_capacity(n);

    for _ in 0..n {
        let next = (0..n)
            .filter(|&v| !ordered[v])
            .max_by_key(|&v| weight[v])
            .expect("an unordered node remains while order.len() < n");
        ordered[next] = true;
        order.push(next);
        for &neighbor in &graph.adjacency[next] {
            if !ordered[neighbor] {
                weight[neighbor] += 1;
            }
        }
    }
    order
}

/// §4.3 step 2: visits nodes in MCS order, assigning each the smallest
/// color not already used by an already-visited neighbour. Optimal (exactly
/// ω colors, the maximum clique size) on a chordal graph.
fn greedy_color(graph: &InterferenceGraph, order: &[usize]) -> Vec<u32> {
    let n = graph.node_count();
    let mut color = vec![u32::MAX; n];
    for &v in order {
        let mut used: HashSet<u32> = HashSet::new();
        for &neighbor in &graph.adjacency[v] {
            if color[neighbor] != u32::MAX {
                used.insert(color[neighbor]);
            }
        }
        let mut c = 0;
        while used.contains(&c) {
            c += 1;
        }
        color[v] = c;
    }
    color
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use chrono_liveness::Intervals;

    fn graph_from_edges(n: usize, edges: &[(usize, usize)]) -> InterferenceGraph {
        let mut adjacency = vec![Vec::new(); n];
        for &(a, b) in edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        let node_of_temp = (0..n).map(|i| (TempId(i as u32), i)).collect();
        let intervals = (0..n).map(|_| Intervals::new()).collect();
        InterferenceGraph { node_of_temp, adjacency, intervals }
    }

    #[test]
    fn disjoint_nodes_share_register_zero() {
        let graph = graph_from_edges(3, &[]);
        let colors = allocate(&graph);
        assert!(colors.iter().all(|&c| c == 0));
    }

    #[test]
    fn a_triangle_needs_exactly_three_colors() {
        let graph = graph_from_edges(3, &[(0, 1), (1, 2), (0, 2)]);
        let colors = allocate(&graph);
        let mut sorted = colors.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test_case(4, &[(0, 1), (1, 2), (2, 3)]; "a path graph")]
    #[test_case(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]; "a cycle graph")]
    #[test_case(6, &[(0, 1), (0, 2), (0, 3), (0, 4), (0, 5)]; "a star graph")]
    fn adjacent_nodes_never_share_a_color(n: usize, edges: &[(usize, usize)]) {
        let graph = graph_from_edges(n, edges);
        let colors = allocate(&graph);
        for &(a, b) in edges {
            assert_ne!(colors[a], colors[b]);
        }
    }
}

// Articulation points of a region's induced subgraph.
//
// # Reference
//
// Hopcroft, John, and Robert Tarjan. "Algorithm 447: efficient algorithms
// for graph manipulation." Communications of the ACM 16.6 (1973): 372-378.

use rustc_hash::FxHashMap;

use crate::graph::AreaGraph;
use crate::region::Region;

const UNVISITED: usize = usize::MAX;

/// Find the areas whose removal would disconnect `region`.
///
/// The induced subgraph has the region's members as nodes and the graph's
/// adjacency restricted to those members as edges. A non-root node is a cut
/// vertex iff one of its DFS-tree children `v` satisfies
/// `low[v] >= disc[u]`; a root is a cut vertex iff it has more than one
/// DFS-tree child. Members and neighbors are visited in ascending id order
/// so the traversal, and therefore the result, is reproducible.
///
/// Pure function: no state survives a call, so different regions may be
/// analyzed concurrently.
pub fn articulation_points(region: &Region, graph: &AreaGraph) -> Vec<usize> {
    let members = region.sorted_area_ids();
    let num_of_members = members.len();
    if num_of_members < 3 {
        // Removing an endpoint of a 2-area region leaves a single area.
        return Vec::new();
    }

    let mut local_index = FxHashMap::default();
    for (index, &id) in members.iter().enumerate() {
        local_index.insert(id, index);
    }

    // Adjacency restricted to the region, in local indices. Graph neighbor
    // lists are ascending, and members are ascending, so local lists stay
    // ascending as well.
    let adjacency: Vec<Vec<usize>> = members
        .iter()
        .map(|&id| {
            graph
                .neighbors(id)
                .iter()
                .filter_map(|neighbor| local_index.get(neighbor).copied())
                .collect()
        })
        .collect();

    let mut disc = vec![UNVISITED; num_of_members];
    let mut low = vec![0; num_of_members];
    let mut parent = vec![UNVISITED; num_of_members];
    let mut is_cut_vertex = vec![false; num_of_members];
    let mut timer = 0;

    // Iterative DFS: each stack frame is (vertex, next neighbor cursor).
    // Regions can hold thousands of areas, which rules out recursion.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..num_of_members {
        if disc[root] != UNVISITED {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        let mut root_children = 0;
        stack.push((root, 0));

        while let Some(&(vertex, cursor)) = stack.last() {
            if cursor < adjacency[vertex].len() {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                let next = adjacency[vertex][cursor];
                if disc[next] == UNVISITED {
                    parent[next] = vertex;
                    if vertex == root {
                        root_children += 1;
                    }
                    disc[next] = timer;
                    low[next] = timer;
                    timer += 1;
                    stack.push((next, 0));
                } else if next != parent[vertex] {
                    low[vertex] = low[vertex].min(disc[next]);
                }
            } else {
                stack.pop();
                if let Some(&(up, _)) = stack.last() {
                    low[up] = low[up].min(low[vertex]);
                    if up != root && low[vertex] >= disc[up] {
                        is_cut_vertex[up] = true;
                    }
                }
            }
        }

        if root_children > 1 {
            is_cut_vertex[root] = true;
        }
    }

    members
        .into_iter()
        .enumerate()
        .filter(|&(index, _)| is_cut_vertex[index])
        .map(|(_, id)| id)
        .collect()
}

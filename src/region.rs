use rustc_hash::FxHashSet;

use crate::algorithms::Error;
use crate::graph::AreaGraph;

/// A contiguous group of areas forming one part of the partition.
///
/// The region owns its member id set plus derived aggregates: the summed
/// extensive attribute, the heterogeneity of the internal attribute, the
/// margin (members with at least one neighbor outside the region) and the
/// growth frontier (unassigned areas adjacent to the region). All
/// aggregates are maintained incrementally under `add_area`/`remove_area`.
///
/// Heterogeneity is the sum over unordered member pairs of the absolute
/// difference of their internal attributes. One definition everywhere:
/// growth, refinement and validation all use this quantity.
#[derive(Debug, Clone)]
pub struct Region {
    index: usize,
    threshold: i64,
    areas: FxHashSet<usize>,
    margin: FxHashSet<usize>,
    frontier: FxHashSet<usize>,
    extensive_sum: i64,
    hetero: i64,
}

impl Region {
    /// Create a single-area region from a seed and label the seed in the
    /// graph. The frontier starts as the seed's unassigned neighbors.
    pub fn new(index: usize, seed_id: usize, threshold: i64, graph: &mut AreaGraph) -> Self {
        graph.assign(seed_id, index);

        let mut areas = FxHashSet::default();
        areas.insert(seed_id);

        let mut margin = FxHashSet::default();
        if !graph.neighbors(seed_id).is_empty() {
            margin.insert(seed_id);
        }

        let frontier = graph
            .neighbors(seed_id)
            .iter()
            .copied()
            .filter(|&neighbor| graph.region_of(neighbor).is_none())
            .collect();

        Self {
            index,
            threshold,
            areas,
            margin,
            frontier,
            extensive_sum: graph.area(seed_id).extensive_attr,
            hetero: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.areas.contains(&id)
    }

    /// Member ids in ascending order.
    pub fn sorted_area_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.areas.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Members with at least one neighbor outside the region.
    pub fn margin(&self) -> &FxHashSet<usize> {
        &self.margin
    }

    pub fn extensive_sum(&self) -> i64 {
        self.extensive_sum
    }

    /// Current aggregate dispersion of the internal attribute.
    pub fn region_hetero(&self) -> i64 {
        self.hetero
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// True iff the summed extensive attribute meets the threshold.
    /// A threshold of 0 is always satisfied.
    pub fn is_complete(&self) -> bool {
        self.extensive_sum >= self.threshold
    }

    /// Heterogeneity increase if `id` joined the region.
    pub fn hetero_increase(&self, graph: &AreaGraph, id: usize) -> i64 {
        let value = graph.area(id).internal_attr;
        self.areas
            .iter()
            .map(|&member| (value - graph.area(member).internal_attr).abs())
            .sum()
    }

    /// Heterogeneity decrease if member `id` left the region.
    pub fn hetero_decrease(&self, graph: &AreaGraph, id: usize) -> i64 {
        let value = graph.area(id).internal_attr;
        self.areas
            .iter()
            .filter(|&&member| member != id)
            .map(|&member| (value - graph.area(member).internal_attr).abs())
            .sum()
    }

    /// Add `id` to the region and label it in the graph.
    ///
    /// The area must be adjacent to the region (contiguity by construction);
    /// aggregates, margin and frontier update incrementally.
    pub fn add_area(&mut self, graph: &mut AreaGraph, id: usize) {
        debug_assert!(!self.areas.contains(&id));
        debug_assert!(
            graph.neighbors(id).iter().any(|neighbor| self.areas.contains(neighbor)),
            "area {id} is not adjacent to region {}",
            self.index
        );

        self.hetero += self.hetero_increase(graph, id);
        self.extensive_sum += graph.area(id).extensive_attr;
        graph.assign(id, self.index);
        self.areas.insert(id);
        self.frontier.remove(&id);

        let mut on_margin = false;
        for &neighbor in graph.neighbors(id) {
            if self.areas.contains(&neighbor) {
                // The new member may have turned this neighbor interior.
                if self.margin.contains(&neighbor)
                    && graph.neighbors(neighbor).iter().all(|m| self.areas.contains(m))
                {
                    self.margin.remove(&neighbor);
                }
            } else {
                on_margin = true;
                if graph.region_of(neighbor).is_none() {
                    self.frontier.insert(neighbor);
                }
            }
        }
        if on_margin {
            self.margin.insert(id);
        }
    }

    /// Remove member `id` from the region and clear its label.
    ///
    /// The caller is responsible for keeping the region connected; movable
    /// areas come from the articulation-point analysis.
    pub fn remove_area(&mut self, graph: &mut AreaGraph, id: usize) {
        debug_assert!(self.areas.contains(&id));
        debug_assert!(self.areas.len() > 1);

        self.hetero -= self.hetero_decrease(graph, id);
        self.extensive_sum -= graph.area(id).extensive_attr;
        self.areas.remove(&id);
        self.margin.remove(&id);
        graph.unassign(id);

        // Every remaining neighbor of the removed area now borders outside.
        for &neighbor in graph.neighbors(id) {
            if self.areas.contains(&neighbor) {
                self.margin.insert(neighbor);
            }
        }
    }

    /// Pop the frontier area with the smallest heterogeneity increase,
    /// breaking ties by smallest id. Frontier entries assigned to another
    /// region in the meantime are pruned lazily here.
    pub(crate) fn best_frontier_candidate(&mut self, graph: &AreaGraph) -> Option<usize> {
        let mut best: Option<(i64, usize)> = None;
        let mut stale = Vec::new();
        for &candidate in &self.frontier {
            if graph.region_of(candidate).is_some() {
                stale.push(candidate);
                continue;
            }
            let key = (self.hetero_increase(graph, candidate), candidate);
            if best.map_or(true, |current| key < current) {
                best = Some(key);
            }
        }
        for candidate in stale {
            self.frontier.remove(&candidate);
        }
        best.map(|(_, candidate)| candidate)
    }

    /// Whether the induced subgraph on the member set is connected.
    pub fn is_connected(&self, graph: &AreaGraph) -> bool {
        let Some(&start) = self.areas.iter().next() else {
            return false;
        };
        let mut visited = FxHashSet::default();
        visited.insert(start);
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            for &neighbor in graph.neighbors(id) {
                if self.areas.contains(&neighbor) && visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        visited.len() == self.areas.len()
    }

    /// Total heterogeneity over a set of regions.
    pub fn total_hetero(regions: &[Region]) -> i64 {
        regions.iter().map(|region| region.hetero).sum()
    }
}

/// Build a `Region` array from a complete label array.
///
/// This is the explicit constructor for pre-built partitions: refinement
/// and tests start from plain labels instead of poking solver internals.
/// Labels must cover every area with region ids below `num_of_regions`,
/// and no region may come out empty. Connectivity is not checked here;
/// that is the validator's job.
pub fn regions_from_labels(
    graph: &mut AreaGraph,
    labels: &[usize],
    num_of_regions: usize,
    threshold: i64,
) -> Result<Vec<Region>, Error> {
    if labels.len() != graph.len() {
        return Err(Error::InputLenMismatch {
            expected: graph.len(),
            actual: labels.len(),
        });
    }
    if num_of_regions == 0 {
        return Err(Error::ZeroRegions);
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); num_of_regions];
    for (area, &label) in labels.iter().enumerate() {
        if label >= num_of_regions {
            return Err(Error::InvalidAssignment { area, region: label });
        }
        members[label].push(area);
        graph.assign(area, label);
    }

    let mut regions = Vec::with_capacity(num_of_regions);
    for (index, ids) in members.iter().enumerate() {
        if ids.is_empty() {
            return Err(Error::EmptyRegion { region: index });
        }

        let mut extensive_sum = 0;
        let mut hetero = 0;
        for (slot, &id) in ids.iter().enumerate() {
            extensive_sum += graph.area(id).extensive_attr;
            let value = graph.area(id).internal_attr;
            for &other in &ids[slot + 1..] {
                hetero += (value - graph.area(other).internal_attr).abs();
            }
        }

        let areas: FxHashSet<usize> = ids.iter().copied().collect();
        let margin = ids
            .iter()
            .copied()
            .filter(|&id| graph.neighbors(id).iter().any(|neighbor| !areas.contains(neighbor)))
            .collect();

        regions.push(Region {
            index,
            threshold,
            areas,
            margin,
            frontier: FxHashSet::default(),
            extensive_sum,
            hetero,
        });
    }

    Ok(regions)
}

// Local-search refinement of a feasible partition: hill climbing with a
// cooled probabilistic acceptance of non-improving moves. The cooling only
// affects exploration; every applied move is contiguity- and
// threshold-checked, so the refiner cannot leave the feasible space.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::algorithms::tarjan::articulation_points;
use crate::algorithms::Error;
use crate::graph::AreaGraph;
use crate::region::{regions_from_labels, Region};
use crate::Partition;

#[derive(Debug, Clone, Copy)]
struct CandidateMove {
    // The area to relabel.
    area: usize,

    // The region the area currently belongs to.
    source: usize,

    // The adjacent region the area would move to.
    dest: usize,

    // Change in total heterogeneity if the move were applied.
    delta: i64,
}

/// Diagnostic data for one refinement run.
#[derive(Debug, Clone, Copy)]
pub struct LocalOptSummary {
    /// Heterogeneity of the partition the run started from.
    pub initial_hetero: i64,

    /// Heterogeneity of the best partition seen, which the run leaves in
    /// place when it returns.
    pub best_hetero: i64,

    /// Number of moves actually applied, including accepted non-improving
    /// ones.
    pub moves_applied: u64,

    pub total_time: Duration,
}

/// The margin areas of `region` that may leave it: not a cut vertex, the
/// region keeps at least one other member, and the remaining extensive
/// attribute still meets the threshold (a threshold of 0 never binds).
/// Returned in ascending id order.
pub fn movable_areas(region: &Region, graph: &AreaGraph, threshold: i64) -> Vec<usize> {
    if region.size() < 2 {
        return Vec::new();
    }
    let cut_vertices: FxHashSet<usize> =
        articulation_points(region, graph).into_iter().collect();

    let mut ids: Vec<usize> = region
        .margin()
        .iter()
        .copied()
        .filter(|id| !cut_vertices.contains(id))
        .filter(|&id| {
            threshold == 0
                || region.extensive_sum() - graph.area(id).extensive_attr >= threshold
        })
        .collect();
    ids.sort_unstable();
    ids
}

// All feasible moves of the current partition. Movable areas are computed
// per region in parallel; the caller applies at most one move afterwards,
// so the scan never races a mutation.
fn enumerate_moves(graph: &AreaGraph, regions: &[Region], threshold: i64) -> Vec<CandidateMove> {
    let movable: Vec<Vec<usize>> = regions
        .par_iter()
        .map(|region| movable_areas(region, graph, threshold))
        .collect();

    let mut moves = Vec::new();
    for (source, ids) in movable.iter().enumerate() {
        for &area in ids {
            let removal_gain = regions[source].hetero_decrease(graph, area);
            let mut destinations = FxHashSet::default();
            for &neighbor in graph.neighbors(area) {
                if let Some(dest) = graph.region_of(neighbor) {
                    if dest != source && destinations.insert(dest) {
                        let delta = regions[dest].hetero_increase(graph, area) - removal_gain;
                        moves.push(CandidateMove { area, source, dest, delta });
                    }
                }
            }
        }
    }
    moves
}

fn apply_move(graph: &mut AreaGraph, regions: &mut [Region], chosen: CandidateMove) {
    regions[chosen.source].remove_area(graph, chosen.area);
    regions[chosen.dest].add_area(graph, chosen.area);
}

/// Local Optimization
///
/// Iteratively improves a feasible partition. Each step enumerates the
/// moves that keep every region connected and over threshold, applies the
/// best improving one, and otherwise accepts the least-bad move with a
/// probability that shrinks by a factor of `alpha` per non-improving step.
/// The best assignment seen is restored before returning.
#[derive(Debug, Clone, Copy)]
pub struct LocalOptimization {
    /// Number of consecutive non-improving steps tolerated before the run
    /// stops.
    pub max_no_improve: u32,

    /// Cooling factor in (0, 1): the acceptance probability of the k-th
    /// non-improving step is alpha^k.
    pub alpha: f64,

    /// Minimum summed extensive attribute per region, matching the value
    /// the partition was built with.
    pub threshold: i64,

    /// Seed for the acceptance draws.
    pub seed: Option<u64>,
}

impl Default for LocalOptimization {
    fn default() -> Self {
        LocalOptimization {
            max_no_improve: 100,
            alpha: 0.99,
            threshold: 0,
            seed: None,
        }
    }
}

impl LocalOptimization {
    /// Refine `regions` in place. On return the partition is the best one
    /// found and carries the same feasibility guarantees it came in with.
    pub fn refine(
        &self,
        graph: &mut AreaGraph,
        regions: &mut Vec<Region>,
    ) -> Result<LocalOptSummary, Error> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidCoolingFactor { alpha: self.alpha });
        }
        if self.threshold < 0 {
            return Err(Error::NegativeValues);
        }
        if regions.is_empty() {
            return Err(Error::ZeroRegions);
        }

        // The refiner only makes sense on a complete assignment.
        let mut labels = vec![usize::MAX; graph.len()];
        for region in regions.iter() {
            for id in region.sorted_area_ids() {
                labels[id] = region.index();
            }
        }
        if let Some(area) = labels.iter().position(|&label| label == usize::MAX) {
            return Err(Error::UncoveredArea { area });
        }

        let start = Instant::now();
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let initial_hetero = Region::total_hetero(regions);
        let mut current_hetero = initial_hetero;
        let mut best_hetero = initial_hetero;
        let mut best_labels = labels.clone();
        let mut moves_applied = 0;
        let mut no_improve = 0;
        let mut cooling_steps = 0u32;

        while no_improve < self.max_no_improve {
            let moves = enumerate_moves(graph, regions, self.threshold);
            let Some(chosen) = moves
                .iter()
                .min_by_key(|candidate| (candidate.delta, candidate.area, candidate.dest))
                .copied()
            else {
                // Nothing can move; the state cannot change anymore.
                break;
            };

            if chosen.delta >= 0 {
                cooling_steps += 1;
                if rng.gen::<f64>() >= self.alpha.powi(cooling_steps as i32) {
                    no_improve += 1;
                    continue;
                }
            }

            apply_move(graph, regions, chosen);
            labels[chosen.area] = chosen.dest;
            current_hetero += chosen.delta;
            moves_applied += 1;

            if current_hetero < best_hetero {
                best_hetero = current_hetero;
                best_labels.copy_from_slice(&labels);
                no_improve = 0;
            } else {
                no_improve += 1;
            }
        }

        // Leave the best assignment in place, not the last explored one.
        let num_of_regions = regions.len();
        *regions = regions_from_labels(graph, &best_labels, num_of_regions, self.threshold)?;

        Ok(LocalOptSummary {
            initial_hetero,
            best_hetero,
            moves_applied,
            total_time: start.elapsed(),
        })
    }
}

impl<'a> Partition<&'a AreaGraph> for LocalOptimization {
    type Metadata = LocalOptSummary;
    type Error = Error;

    fn partition(
        &mut self,
        part_ids: &mut [usize],
        graph: &'a AreaGraph,
    ) -> Result<Self::Metadata, Self::Error> {
        if part_ids.len() != graph.len() {
            return Err(Error::InputLenMismatch {
                expected: graph.len(),
                actual: part_ids.len(),
            });
        }

        let num_of_regions = part_ids.iter().max().map_or(0, |&max| max + 1);
        let mut run_graph = graph.clone();
        run_graph.reset_assignments();
        let mut regions =
            regions_from_labels(&mut run_graph, part_ids, num_of_regions, self.threshold)?;

        let summary = self.refine(&mut run_graph, &mut regions)?;

        for region in &regions {
            for id in region.sorted_area_ids() {
                part_ids[id] = region.index();
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use itertools::assert_equal;

    use super::*;
    use crate::algorithms::GlobalSearch;
    use crate::validator::check_partition;

    fn path_graph(extensive_attrs: Vec<i64>, internal_attrs: Vec<i64>) -> AreaGraph {
        let num_of_areas = extensive_attrs.len();
        let neighbors = (0..num_of_areas)
            .map(|id| if id + 1 < num_of_areas { vec![id + 1] } else { vec![] })
            .collect();
        AreaGraph::from_parts(neighbors, extensive_attrs, internal_attrs).unwrap()
    }

    #[test]
    fn test_movable_areas_exclude_cut_vertices() {
        // Arrange: line 0-1-2-3-4 split as {0,1,2} and {3,4}.
        let mut graph = path_graph(vec![1; 5], vec![0; 5]);
        let regions = regions_from_labels(&mut graph, &[0, 0, 0, 1, 1], 2, 0).unwrap();

        // Act
        let movable_first = movable_areas(&regions[0], &graph, 0);
        let movable_second = movable_areas(&regions[1], &graph, 0);

        // Assert: area 1 is a cut vertex of region 0, areas 0 and 2 are
        // not, but only area 2 sits on the margin.
        assert_equal(movable_first, [2]);
        assert_equal(movable_second, [3]);
    }

    #[test]
    fn test_movable_areas_respect_threshold() {
        // Arrange
        let mut graph = path_graph(vec![1; 5], vec![0; 5]);
        let regions = regions_from_labels(&mut graph, &[0, 0, 0, 1, 1], 2, 2).unwrap();

        // Act and assert: region 1 would fall to 1 < 2, region 0 to 2 >= 2.
        assert!(movable_areas(&regions[1], &graph, 2).is_empty());
        assert_equal(movable_areas(&regions[0], &graph, 2), [2]);
    }

    #[test]
    fn test_refine_moves_misplaced_area() {
        // Arrange: the internal attributes split cleanly as {0,1} / {2,3},
        // but area 2 starts in region 0.
        let mut graph = path_graph(vec![1; 4], vec![0, 0, 10, 10]);
        let mut regions = regions_from_labels(&mut graph, &[0, 0, 0, 1], 2, 0).unwrap();
        let optimizer = LocalOptimization {
            max_no_improve: 5,
            alpha: 0.5,
            threshold: 0,
            seed: Some(7),
        };

        // Act
        let summary = optimizer.refine(&mut graph, &mut regions).unwrap();

        // Assert
        assert_eq!(summary.initial_hetero, 20);
        assert_eq!(summary.best_hetero, 0);
        assert_equal(regions[0].sorted_area_ids(), [0, 1]);
        assert_equal(regions[1].sorted_area_ids(), [2, 3]);
        assert_eq!(Region::total_hetero(&regions), 0);
    }

    #[test]
    fn test_refine_keeps_threshold_feasibility() {
        // Arrange: both regions sit exactly at the threshold, so no area
        // may move and the partition must come back unchanged.
        let mut graph = path_graph(vec![1; 6], vec![3, 1, 4, 1, 5, 9]);
        let mut regions = regions_from_labels(&mut graph, &[0, 0, 0, 1, 1, 1], 2, 3).unwrap();
        let initial = Region::total_hetero(&regions);
        let optimizer = LocalOptimization { threshold: 3, seed: Some(7), ..Default::default() };

        // Act
        let summary = optimizer.refine(&mut graph, &mut regions).unwrap();

        // Assert
        assert_eq!(summary.best_hetero, initial);
        assert_eq!(summary.moves_applied, 0);
        assert!(check_partition(&graph, &regions, 3, true).is_ok());
    }

    #[test]
    fn test_refine_never_worsens_constructive_result() {
        // Arrange
        let neighbors = {
            let mut lists = vec![Vec::new(); 9];
            for row in 0..3 {
                for col in 0..3 {
                    let id = row * 3 + col;
                    if col + 1 < 3 {
                        lists[id].push(id + 1);
                    }
                    if row + 1 < 3 {
                        lists[id].push(id + 3);
                    }
                }
            }
            lists
        };
        let internal_attrs = vec![4, 18, 2, 9, 7, 11, 3, 14, 6];
        let graph = AreaGraph::from_parts(neighbors, vec![1; 9], internal_attrs).unwrap();
        let search = GlobalSearch { num_of_regions: 3, seed: Some(11), ..Default::default() };
        let outcome = search.run(&graph).unwrap();
        assert!(outcome.solved);

        let mut run_graph = outcome.graph;
        let mut regions = outcome.regions;
        let initial = Region::total_hetero(&regions);
        let optimizer = LocalOptimization { seed: Some(11), ..Default::default() };

        // Act
        let summary = optimizer.refine(&mut run_graph, &mut regions).unwrap();

        // Assert
        assert!(summary.best_hetero <= initial);
        assert_eq!(summary.best_hetero, Region::total_hetero(&regions));
        assert!(check_partition(&run_graph, &regions, 0, true).is_ok());
    }

    #[test]
    fn test_refine_rejects_bad_cooling_factor() {
        // Arrange
        let mut graph = path_graph(vec![1; 2], vec![0, 0]);
        let mut regions = regions_from_labels(&mut graph, &[0, 1], 2, 0).unwrap();

        for alpha in [0.0, 1.0, 1.5, -0.3] {
            let optimizer = LocalOptimization { alpha, ..Default::default() };

            // Act
            let result = optimizer.refine(&mut graph, &mut regions);

            // Assert
            assert!(matches!(result, Err(Error::InvalidCoolingFactor { .. })));
        }
    }

    #[test]
    fn test_refine_rejects_empty_partition() {
        // Arrange
        let mut graph = path_graph(vec![1; 2], vec![0, 0]);
        let mut regions = Vec::new();

        // Act
        let result = LocalOptimization::default().refine(&mut graph, &mut regions);

        // Assert
        assert!(matches!(result, Err(Error::ZeroRegions)));
    }

    #[test]
    fn test_partition_trait_refines_labels_in_place() {
        // Arrange
        let graph = path_graph(vec![1; 4], vec![0, 0, 10, 10]);
        let mut part_ids = vec![0, 0, 0, 1];
        let mut optimizer = LocalOptimization {
            max_no_improve: 5,
            alpha: 0.5,
            threshold: 0,
            seed: Some(7),
        };

        // Act
        let summary = optimizer.partition(&mut part_ids, &graph).unwrap();

        // Assert
        assert_eq!(summary.best_hetero, 0);
        assert_eq!(part_ids, vec![0, 0, 1, 1]);
    }
}

// Constructive global search for the p-regions problem.
//
// # Reference
//
// Duque, Juan C., Richard L. Church, and Richard S. Middleton. "The
// p-regions problem." Geographical Analysis 43.1 (2011): 104-126.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::algorithms::tarjan::articulation_points;
use crate::algorithms::Error;
use crate::graph::AreaGraph;
use crate::region::Region;
use crate::Partition;

/// Wall-clock duration of each constructive phase. Recorded for
/// observability; no algorithmic decision depends on these values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub seed_identification: Duration,
    pub region_growth: Duration,
    pub enclave_assignment: Duration,
    pub interregion_update: Duration,
    pub indirect_flow_push: Duration,
    pub total: Duration,
}

/// Result of one constructive run.
///
/// An infeasible configuration is a normal outcome, not an error:
/// `solved` is false and the partial assignment stays available for
/// diagnostics.
#[derive(Debug)]
pub struct GlobalSearchOutcome {
    /// True iff every region is non-empty, connected, covers its share of
    /// the area set and meets the threshold.
    pub solved: bool,

    /// Minimum pairwise graph distance of the chosen seed set.
    pub seed_quality: f64,

    pub timings: PhaseTimings,

    /// The regions built by the run, best effort when unsolved.
    pub regions: Vec<Region>,

    /// The run's private copy of the areas, carrying the final labels.
    pub graph: AreaGraph,
}

impl GlobalSearchOutcome {
    /// Region label of every area, by id. Unassigned areas are `None`.
    pub fn labels(&self) -> Vec<Option<usize>> {
        self.graph.labels()
    }

    /// Total heterogeneity over the regions built so far.
    pub fn total_hetero(&self) -> i64 {
        Region::total_hetero(&self.regions)
    }
}

/// Global Search
///
/// Builds an initial feasible partition of the area graph into
/// `num_of_regions` contiguous regions: seed identification, region
/// growth, enclave assignment, then the optional inter-region update and
/// indirect flow push repair phases for thresholded instances.
///
/// # Example
///
/// ```no_run
/// use RegionCut::algorithms::GlobalSearch;
/// use RegionCut::gen_attrs::gen_uniform_attrs;
/// use RegionCut::graph::AreaGraph;
/// use RegionCut::io::read_matrix_market_as_neighbors;
/// use std::path::Path;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
///
///     let neighbors = read_matrix_market_as_neighbors(Path::new("./testdata/adjacency.mtx"))?;
///     let n = neighbors.len();
///     let graph = AreaGraph::from_parts(neighbors, gen_uniform_attrs(n), gen_uniform_attrs(n))?;
///
///     let outcome = GlobalSearch { num_of_regions: 4, ..Default::default() }.run(&graph)?;
///     assert!(outcome.solved);
/// #   Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GlobalSearch {
    /// Number of regions (p).
    pub num_of_regions: usize,

    /// Minimum summed extensive attribute per region. 0 disables the
    /// constraint (the classic p-regions case).
    pub threshold: i64,

    /// Number of candidate seed sets sampled during seed identification.
    pub seed_iteration_budget: usize,

    /// Seed for the run's random generator.
    pub seed: Option<u64>,

    /// Whether a region keeps growing after it meets the threshold. When
    /// false, growth stops at completion and leftover areas are handled by
    /// enclave assignment.
    pub grow_past_completion: bool,

    /// Whether deficient regions may pull margin areas from adjacent
    /// over-threshold regions. Only runs when the threshold is positive.
    pub interregion_update: bool,

    /// Whether surplus extensive attribute may be routed to a deficient
    /// region across a chain of intermediate regions. Only runs when the
    /// threshold is positive.
    pub indirect_flow_push: bool,

    /// Report per-phase progress on stderr.
    pub verbose: bool,
}

impl Default for GlobalSearch {
    fn default() -> Self {
        GlobalSearch {
            num_of_regions: 2,
            threshold: 0,
            seed_iteration_budget: 16,
            seed: None,
            grow_past_completion: true,
            interregion_update: true,
            indirect_flow_push: true,
            verbose: false,
        }
    }
}

impl GlobalSearch {
    /// Run the constructive search on a private copy of `input`.
    ///
    /// Invalid parameters are rejected before any phase runs. An
    /// infeasible configuration (for instance more regions than areas, or
    /// an unreachable threshold) is reported through the outcome.
    pub fn run(&self, input: &AreaGraph) -> Result<GlobalSearchOutcome, Error> {
        if self.num_of_regions == 0 {
            return Err(Error::ZeroRegions);
        }
        if self.threshold < 0 {
            return Err(Error::NegativeValues);
        }

        let mut graph = input.clone();
        graph.reset_assignments();
        let total_start = Instant::now();
        let mut timings = PhaseTimings::default();

        // Infeasible configurations are a normal outcome: more regions
        // than areas, or less extensive attribute than the regions would
        // collectively need.
        let threshold_unreachable = self.threshold > 0
            && graph.total_extensive_attr()
                < self.threshold.saturating_mul(self.num_of_regions as i64);
        if self.num_of_regions > graph.len() || threshold_unreachable {
            timings.total = total_start.elapsed();
            return Ok(GlobalSearchOutcome {
                solved: false,
                seed_quality: 0.0,
                timings,
                regions: Vec::new(),
                graph,
            });
        }

        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let phase_start = Instant::now();
        let (seeds, seed_quality) = identify_seeds(
            &graph,
            self.num_of_regions,
            self.seed_iteration_budget.max(1),
            &mut rng,
        );
        timings.seed_identification = phase_start.elapsed();
        if self.verbose {
            eprintln!("seed identification: quality {seed_quality}, seeds {seeds:?}");
        }

        let phase_start = Instant::now();
        let mut regions = grow_regions(&mut graph, &seeds, self.threshold, self.grow_past_completion);
        timings.region_growth = phase_start.elapsed();
        if self.verbose {
            let assigned = graph.labels().iter().filter(|label| label.is_some()).count();
            eprintln!("region growth: {assigned}/{} areas assigned", graph.len());
        }

        let phase_start = Instant::now();
        let enclaves_resolved = assign_enclaves(&mut graph, &mut regions);
        timings.enclave_assignment = phase_start.elapsed();
        if self.verbose && !enclaves_resolved {
            eprintln!("enclave assignment: unreachable enclave, run failed");
        }

        if self.threshold > 0 && self.interregion_update {
            let phase_start = Instant::now();
            interregion_update(&mut graph, &mut regions);
            timings.interregion_update = phase_start.elapsed();
        }

        if self.threshold > 0 && self.indirect_flow_push {
            let phase_start = Instant::now();
            indirect_flow_push(&mut graph, &mut regions);
            timings.indirect_flow_push = phase_start.elapsed();
        }

        let solved = enclaves_resolved && partition_is_solved(&graph, &regions, self.threshold);
        timings.total = total_start.elapsed();
        if self.verbose {
            eprintln!("global search: solved {solved}");
        }

        Ok(GlobalSearchOutcome {
            solved,
            seed_quality,
            timings,
            regions,
            graph,
        })
    }
}

// Sample up to `budget` candidate seed sets and keep the one with the
// largest minimum pairwise distance; the first set attaining the maximum
// wins ties.
fn identify_seeds(
    graph: &AreaGraph,
    num_of_regions: usize,
    budget: usize,
    rng: &mut SmallRng,
) -> (Vec<usize>, f64) {
    let mut ids: Vec<usize> = (0..graph.len()).collect();
    let mut best_seeds = Vec::new();
    let mut best_quality = -1.0;

    for _ in 0..budget {
        ids.shuffle(rng);
        let candidate = &ids[..num_of_regions];
        let quality = seed_set_quality(graph, candidate);
        if quality > best_quality {
            best_quality = quality;
            best_seeds = candidate.to_vec();
        }
    }

    (best_seeds, best_quality)
}

// Minimum pairwise BFS hop distance within a seed set. Unreachable pairs
// count as the area count, farther than any reachable pair: components
// must host their own seeds for a contiguous cover to exist, so spreading
// seeds across components is the best a candidate set can do.
fn seed_set_quality(graph: &AreaGraph, seeds: &[usize]) -> f64 {
    let unreachable = graph.len();
    if seeds.len() < 2 {
        return unreachable as f64;
    }

    let min_distance = seeds
        .par_iter()
        .enumerate()
        .map(|(slot, &seed)| {
            let targets = &seeds[slot + 1..];
            if targets.is_empty() {
                return usize::MAX;
            }
            graph
                .hop_distances_to(seed, targets)
                .into_iter()
                .map(|distance| distance.unwrap_or(unreachable))
                .min()
                .unwrap_or(usize::MAX)
        })
        .min()
        .unwrap_or(0);

    min_distance as f64
}

// Grow one region per seed, round-robin. Each turn a region absorbs the
// frontier area with the smallest heterogeneity increase.
fn grow_regions(
    graph: &mut AreaGraph,
    seeds: &[usize],
    threshold: i64,
    grow_past_completion: bool,
) -> Vec<Region> {
    let mut regions: Vec<Region> = seeds
        .iter()
        .enumerate()
        .map(|(index, &seed)| Region::new(index, seed, threshold, graph))
        .collect();

    let mut growing = true;
    while growing {
        growing = false;
        for region in &mut regions {
            if !grow_past_completion && threshold > 0 && region.is_complete() {
                continue;
            }
            if let Some(candidate) = region.best_frontier_candidate(graph) {
                region.add_area(graph, candidate);
                growing = true;
            }
        }
    }

    regions
}

// Merge every leftover unassigned area into the adjacent region with the
// smallest heterogeneity increase. Areas with no assigned neighbor are
// deferred to the next pass; a pass without progress means an enclave has
// no path to any region, which makes a contiguous cover impossible.
fn assign_enclaves(graph: &mut AreaGraph, regions: &mut [Region]) -> bool {
    let mut enclaves: Vec<usize> =
        (0..graph.len()).filter(|&id| graph.region_of(id).is_none()).collect();

    while !enclaves.is_empty() {
        let mut progressed = false;
        let mut deferred = Vec::new();

        for &enclave in &enclaves {
            let mut best: Option<(i64, usize)> = None;
            let mut candidates = FxHashSet::default();
            for &neighbor in graph.neighbors(enclave) {
                if let Some(region) = graph.region_of(neighbor) {
                    if candidates.insert(region) {
                        let key = (regions[region].hetero_increase(graph, enclave), region);
                        if best.map_or(true, |current| key < current) {
                            best = Some(key);
                        }
                    }
                }
            }
            match best {
                Some((_, region)) => {
                    regions[region].add_area(graph, enclave);
                    progressed = true;
                }
                None => deferred.push(enclave),
            }
        }

        if !progressed {
            return false;
        }
        enclaves = deferred;
    }

    true
}

// Best margin area `donor` could hand to `receiver`: adjacent to the
// receiver, not a cut vertex of the donor, and the donor keeps meeting
// its threshold. Returns the receiver's heterogeneity increase and the
// area id, smallest increase first, ties by smallest id.
fn best_link_transfer(
    graph: &AreaGraph,
    regions: &[Region],
    donor: usize,
    receiver: usize,
) -> Option<(i64, usize)> {
    if regions[donor].size() < 2 {
        return None;
    }
    let cut_vertices: FxHashSet<usize> =
        articulation_points(&regions[donor], graph).into_iter().collect();
    let donor_sum = regions[donor].extensive_sum();
    let threshold = regions[donor].threshold();

    let mut best: Option<(i64, usize)> = None;
    for &area in regions[donor].margin() {
        if cut_vertices.contains(&area) {
            continue;
        }
        if donor_sum - graph.area(area).extensive_attr < threshold {
            continue;
        }
        if !graph
            .neighbors(area)
            .iter()
            .any(|&neighbor| graph.region_of(neighbor) == Some(receiver))
        {
            continue;
        }
        let key = (regions[receiver].hetero_increase(graph, area), area);
        if best.map_or(true, |current| key < current) {
            best = Some(key);
        }
    }
    best
}

// Pull margin areas from adjacent over-threshold regions into each
// deficient region until it is complete or no donor candidate remains.
fn interregion_update(graph: &mut AreaGraph, regions: &mut [Region]) {
    for target in 0..regions.len() {
        while !regions[target].is_complete() {
            let mut best: Option<(i64, usize, usize)> = None;
            for donor in 0..regions.len() {
                if donor == target {
                    continue;
                }
                if let Some((delta, area)) = best_link_transfer(graph, regions, donor, target) {
                    let key = (delta, area, donor);
                    if best.map_or(true, |current| key < current) {
                        best = Some(key);
                    }
                }
            }
            match best {
                Some((_, area, donor)) => {
                    regions[donor].remove_area(graph, area);
                    regions[target].add_area(graph, area);
                }
                None => break,
            }
        }
    }
}

// Which regions touch which: two regions are adjacent when any of their
// member areas are.
fn region_adjacency(graph: &AreaGraph, num_of_regions: usize) -> Vec<FxHashSet<usize>> {
    let mut adjacency = vec![FxHashSet::default(); num_of_regions];
    for id in 0..graph.len() {
        let Some(region) = graph.region_of(id) else {
            continue;
        };
        for &neighbor in graph.neighbors(id) {
            if let Some(other) = graph.region_of(neighbor) {
                if other != region {
                    adjacency[region].insert(other);
                }
            }
        }
    }
    adjacency
}

// Shortest region-adjacency path from `target` to a region holding
// surplus extensive attribute. The path starts at the target and ends at
// the surplus region.
fn find_surplus_path(graph: &AreaGraph, regions: &[Region], target: usize) -> Option<Vec<usize>> {
    let adjacency = region_adjacency(graph, regions.len());
    let mut parent = vec![None; regions.len()];
    let mut visited = vec![false; regions.len()];
    let mut queue = std::collections::VecDeque::new();

    visited[target] = true;
    queue.push_back(target);
    while let Some(region) = queue.pop_front() {
        if region != target && regions[region].extensive_sum() > regions[region].threshold() {
            let mut path = vec![region];
            let mut cursor = region;
            while let Some(previous) = parent[cursor] {
                path.push(previous);
                cursor = previous;
            }
            path.reverse();
            return Some(path);
        }
        for &next in &adjacency[region] {
            if !visited[next] {
                visited[next] = true;
                parent[next] = Some(region);
                queue.push_back(next);
            }
        }
    }
    None
}

// Route surplus extensive attribute to each still-deficient region along
// a chain of regions, one boundary area per link, applied from the
// surplus end so every donor has already received before it gives.
fn indirect_flow_push(graph: &mut AreaGraph, regions: &mut [Region]) {
    for target in 0..regions.len() {
        while !regions[target].is_complete() {
            let Some(path) = find_surplus_path(graph, regions, target) else {
                break;
            };
            let before = regions[target].extensive_sum();
            let mut chain_intact = true;

            for link in path.windows(2).rev() {
                let receiver = link[0];
                let donor = link[1];
                match best_link_transfer(graph, regions, donor, receiver) {
                    Some((_, area)) => {
                        regions[donor].remove_area(graph, area);
                        regions[receiver].add_area(graph, area);
                    }
                    None => {
                        chain_intact = false;
                        break;
                    }
                }
            }

            if !chain_intact || regions[target].extensive_sum() <= before {
                break;
            }
        }
    }
}

fn partition_is_solved(graph: &AreaGraph, regions: &[Region], threshold: i64) -> bool {
    if regions.is_empty() {
        return false;
    }
    let all_assigned = (0..graph.len()).all(|id| graph.region_of(id).is_some());
    all_assigned
        && regions.iter().all(|region| {
            !region.is_empty()
                && region.is_connected(graph)
                && (threshold == 0 || region.extensive_sum() >= threshold)
        })
}

impl<'a> Partition<&'a AreaGraph> for GlobalSearch {
    type Metadata = GlobalSearchOutcome;
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
        let outcome = self.run(graph)?;
        if !outcome.solved {
            return Err(Error::NoFeasiblePartition);
        }
        for (id, label) in outcome.graph.labels().into_iter().enumerate() {
            if let Some(region) = label {
                part_ids[id] = region;
            }
        }
        Ok(outcome)
    }
}

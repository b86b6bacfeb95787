use std::collections::VecDeque;

use crate::algorithms::Error;

/// A single spatial unit: adjacency, a capacity-like extensive attribute
/// and the internal attribute whose within-region dispersion the solver
/// minimizes.
#[derive(Debug, Clone)]
pub struct Area {
    /// Stable external index, dense in 0..n.
    pub id: usize,

    /// Non-negative quantity summed per region and compared to the threshold.
    pub extensive_attr: i64,

    /// Scalar whose within-region dispersion defines heterogeneity.
    pub internal_attr: i64,

    /// Ids of adjacent areas. Sorted, deduplicated, symmetric, no self-loops.
    neighbors: Vec<usize>,

    /// Current region label. `None` while unassigned.
    region: Option<usize>,
}

impl Area {
    /// Ids of the areas adjacent to this one, in ascending order.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// The region this area currently belongs to, if any.
    pub fn region(&self) -> Option<usize> {
        self.region
    }
}

/// Struct that represents the full set of areas of one run.
///
/// Adjacency is stored as id sets over a single owned area array; every
/// component of the solver addresses areas by id, never by reference, so a
/// `clone()` of the graph is the private copy an independent run works on.
#[derive(Debug, Clone)]
pub struct AreaGraph {
    areas: Vec<Area>,
}

impl AreaGraph {
    /// Build a graph from per-area neighbor lists and attribute vectors.
    ///
    /// Neighbor lists are symmetrized, sorted and deduplicated; self-loops
    /// are dropped. Extensive attributes must be non-negative.
    pub fn from_parts(
        neighbor_lists: Vec<Vec<usize>>,
        extensive_attrs: Vec<i64>,
        internal_attrs: Vec<i64>,
    ) -> Result<Self, Error> {
        let num_of_areas = neighbor_lists.len();
        if extensive_attrs.len() != num_of_areas {
            return Err(Error::InputLenMismatch {
                expected: num_of_areas,
                actual: extensive_attrs.len(),
            });
        }
        if internal_attrs.len() != num_of_areas {
            return Err(Error::InputLenMismatch {
                expected: num_of_areas,
                actual: internal_attrs.len(),
            });
        }
        if extensive_attrs.iter().any(|&attr| attr < 0) {
            return Err(Error::NegativeValues);
        }

        let mut adjacency = vec![Vec::new(); num_of_areas];
        for (area, list) in neighbor_lists.iter().enumerate() {
            for &neighbor in list {
                if neighbor >= num_of_areas {
                    return Err(Error::InvalidNeighbor { area, neighbor });
                }
                if neighbor == area {
                    continue;
                }
                adjacency[area].push(neighbor);
                adjacency[neighbor].push(area);
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }

        let areas = adjacency
            .into_iter()
            .zip(extensive_attrs)
            .zip(internal_attrs)
            .enumerate()
            .map(|(id, ((neighbors, extensive_attr), internal_attr))| Area {
                id,
                extensive_attr,
                internal_attr,
                neighbors,
                region: None,
            })
            .collect();

        Ok(Self { areas })
    }

    /// The number of areas in the graph.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the graph has no areas.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn area(&self, id: usize) -> &Area {
        &self.areas[id]
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Ids of the areas adjacent to `id`, in ascending order.
    pub fn neighbors(&self, id: usize) -> &[usize] {
        &self.areas[id].neighbors
    }

    /// Current region label of `id`, if any.
    pub fn region_of(&self, id: usize) -> Option<usize> {
        self.areas[id].region
    }

    /// Label `id` as belonging to `region`.
    pub fn assign(&mut self, id: usize, region: usize) {
        self.areas[id].region = Some(region);
    }

    /// Clear the region label of `id`.
    pub fn unassign(&mut self, id: usize) {
        self.areas[id].region = None;
    }

    /// Clear every region label. Each run starts from a clean assignment.
    pub fn reset_assignments(&mut self) {
        for area in &mut self.areas {
            area.region = None;
        }
    }

    /// Current region label of every area, by id.
    pub fn labels(&self) -> Vec<Option<usize>> {
        self.areas.iter().map(|area| area.region).collect()
    }

    /// The extensive attribute of every area, by id.
    pub fn extensive_attrs(&self) -> Vec<i64> {
        self.areas.iter().map(|area| area.extensive_attr).collect()
    }

    /// Sum of the extensive attribute over all areas.
    pub fn total_extensive_attr(&self) -> i64 {
        self.areas.iter().map(|area| area.extensive_attr).sum()
    }

    /// BFS hop distances from `source` to each of `targets`.
    ///
    /// Returns one entry per target, `None` when the target is unreachable.
    /// The walk stops as soon as every target has been found.
    pub fn hop_distances_to(&self, source: usize, targets: &[usize]) -> Vec<Option<usize>> {
        let mut distances = vec![None; targets.len()];
        let mut remaining = targets.len();
        let mut visited = vec![false; self.areas.len()];
        let mut queue = VecDeque::new();

        visited[source] = true;
        queue.push_back((source, 0usize));
        while let Some((id, dist)) = queue.pop_front() {
            for (slot, &target) in targets.iter().enumerate() {
                if target == id && distances[slot].is_none() {
                    distances[slot] = Some(dist);
                    remaining -= 1;
                }
            }
            if remaining == 0 {
                break;
            }
            for &neighbor in self.neighbors(id) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }

        distances
    }
}

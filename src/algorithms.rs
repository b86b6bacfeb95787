use std::fmt;

mod global_search;
mod local_optimization;
mod tarjan;

pub use global_search::{GlobalSearch, GlobalSearchOutcome, PhaseTimings};
pub use local_optimization::{movable_areas, LocalOptSummary, LocalOptimization};
pub use tarjan::articulation_points;

/// Common errors thrown by algorithms.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No partition that matches the given criteria could be found.
    ///
    /// Note that the constructive search reports infeasible configurations
    /// through its outcome (`solved == false`); this error is only raised
    /// at the `Partition` trait boundary, where a label array must be
    /// produced or nothing.
    NoFeasiblePartition,

    /// Input sets don't have matching lengths.
    InputLenMismatch { expected: usize, actual: usize },

    /// Input contains negative values and such values are not supported.
    NegativeValues,

    /// A partition into zero regions was requested.
    ZeroRegions,

    /// The refiner's cooling factor must lie strictly between 0 and 1.
    InvalidCoolingFactor { alpha: f64 },

    /// An adjacency list points at an area id outside the graph.
    InvalidNeighbor { area: usize, neighbor: usize },

    /// An area carries a region label that does not fit the partition.
    InvalidAssignment { area: usize, region: usize },

    /// A region of the partition has no member areas.
    EmptyRegion { region: usize },

    /// An area is not covered by any region of a persisted solution.
    UncoveredArea { area: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoFeasiblePartition => write!(f, "no feasible partition found"),
            Error::InputLenMismatch { expected, actual } => write!(
                f,
                "input sets don't have the same length (expected {expected} items, got {actual})",
            ),
            Error::NegativeValues => write!(f, "input contains negative values"),
            Error::ZeroRegions => write!(f, "expected at least one region"),
            Error::InvalidCoolingFactor { alpha } => {
                write!(f, "cooling factor must be in (0, 1), got {alpha}")
            }
            Error::InvalidNeighbor { area, neighbor } => {
                write!(f, "area {area} lists a neighbor {neighbor} outside the graph")
            }
            Error::InvalidAssignment { area, region } => {
                write!(f, "area {area} is assigned to an invalid region {region}")
            }
            Error::EmptyRegion { region } => write!(f, "region {region} has no areas"),
            Error::UncoveredArea { area } => {
                write!(f, "area {area} is not covered by any region")
            }
        }
    }
}

impl std::error::Error for Error {}

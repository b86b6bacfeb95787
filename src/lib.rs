pub mod algorithms;
pub mod gen_attrs;
pub mod graph;
pub mod imbalance;
pub mod io;
pub mod region;
pub mod validator;

// The `Partition` trait allows for partitioning a set of spatial areas
// into regions. Partitioning algorithms implement this trait.
// The generic argument `M` defines the input of the algorithms (here, an
// area graph carrying adjacency and attributes).
// The input partition must be of the correct size and its contents may or
// may not be used by the algorithms: the constructive search ignores it,
// while the refiner treats it as the assignment to improve.
pub trait Partition<M> {
    // Diagnostic data returned for a specific run of the algorithm.
    type Metadata;

    // Error details, should the algorithm fail to run.
    type Error;

    // Partition the given data and output the region ID of each area in
    // `part_ids`.
    //
    // Region IDs must be contiguous and start from zero, meaning the number
    // of regions is one plus the maximum of `part_ids`.  If a lower ID does
    // not appear in the array, the region is assumed to be empty.
    fn partition(&mut self, part_ids: &mut [usize], data: M)
                 -> Result<Self::Metadata, Self::Error>;
}

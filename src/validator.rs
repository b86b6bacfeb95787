use std::fmt;

use crate::graph::AreaGraph;
use crate::region::Region;

/// A single broken partition invariant.
///
/// The validator only reports; it never repairs. A violation after a
/// solver phase points at a defect in that phase, and papering over it
/// would hide the bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An area's label disagrees with the membership of the region that
    /// lists it.
    LabelMismatch {
        area: usize,
        label: Option<usize>,
        region: usize,
    },

    /// An area belongs to no region.
    MissingArea { area: usize },

    /// An area belongs to more than one region.
    DuplicateMembership { area: usize },

    /// A region has no member areas.
    EmptyRegion { region: usize },

    /// A region's induced subgraph is not connected.
    DisconnectedRegion { region: usize },

    /// A region misses the extensive-attribute threshold.
    BelowThreshold {
        region: usize,
        extensive_sum: i64,
        threshold: i64,
    },

    /// A region's stored aggregates disagree with its member areas.
    AggregateMismatch { region: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LabelMismatch { area, label, region } => write!(
                f,
                "area {area} is labelled {label:?} but region {region} lists it as a member",
            ),
            Violation::MissingArea { area } => {
                write!(f, "area {area} belongs to no region")
            }
            Violation::DuplicateMembership { area } => {
                write!(f, "area {area} belongs to more than one region")
            }
            Violation::EmptyRegion { region } => write!(f, "region {region} has no areas"),
            Violation::DisconnectedRegion { region } => {
                write!(f, "region {region} is not connected")
            }
            Violation::BelowThreshold { region, extensive_sum, threshold } => write!(
                f,
                "region {region} holds {extensive_sum} extensive attribute, below the threshold {threshold}",
            ),
            Violation::AggregateMismatch { region } => {
                write!(f, "region {region} carries stale aggregates")
            }
        }
    }
}

/// Check a partition against the full area set.
///
/// Verifies that labels and memberships agree, that the regions cover
/// every area exactly once, that each region is connected and meets the
/// threshold, and that each region's stored aggregates match its members.
/// Returns the first violation found, or all of them when `report_all`.
/// Checking a valid partition is free of side effects, so re-running the
/// validator on an unmodified partition yields the same verdict.
pub fn check_partition(
    graph: &AreaGraph,
    regions: &[Region],
    threshold: i64,
    report_all: bool,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    let mut cover_count = vec![0usize; graph.len()];

    for region in regions {
        for id in region.sorted_area_ids() {
            cover_count[id] += 1;
            if graph.region_of(id) != Some(region.index()) {
                violations.push(Violation::LabelMismatch {
                    area: id,
                    label: graph.region_of(id),
                    region: region.index(),
                });
            }
        }
    }

    for (area, &count) in cover_count.iter().enumerate() {
        if count == 0 {
            violations.push(Violation::MissingArea { area });
        } else if count > 1 {
            violations.push(Violation::DuplicateMembership { area });
        }
    }

    for region in regions {
        if region.is_empty() {
            violations.push(Violation::EmptyRegion { region: region.index() });
            continue;
        }
        if !region.is_connected(graph) {
            violations.push(Violation::DisconnectedRegion { region: region.index() });
        }
        if threshold > 0 && region.extensive_sum() < threshold {
            violations.push(Violation::BelowThreshold {
                region: region.index(),
                extensive_sum: region.extensive_sum(),
                threshold,
            });
        }

        let members = region.sorted_area_ids();
        let extensive_sum: i64 = members.iter().map(|&id| graph.area(id).extensive_attr).sum();
        let mut hetero = 0;
        for (slot, &id) in members.iter().enumerate() {
            let value = graph.area(id).internal_attr;
            for &other in &members[slot + 1..] {
                hetero += (value - graph.area(other).internal_attr).abs();
            }
        }
        if extensive_sum != region.extensive_sum() || hetero != region.region_hetero() {
            violations.push(Violation::AggregateMismatch { region: region.index() });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        if !report_all {
            violations.truncate(1);
        }
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::regions_from_labels;

    fn path_graph(extensive_attrs: Vec<i64>, internal_attrs: Vec<i64>) -> AreaGraph {
        let num_of_areas = extensive_attrs.len();
        let neighbors = (0..num_of_areas)
            .map(|id| if id + 1 < num_of_areas { vec![id + 1] } else { vec![] })
            .collect();
        AreaGraph::from_parts(neighbors, extensive_attrs, internal_attrs).unwrap()
    }

    #[test]
    fn test_valid_partition_passes_and_validation_is_idempotent() {
        // Arrange
        let mut graph = path_graph(vec![1; 4], vec![1, 4, 9, 16]);
        let regions = regions_from_labels(&mut graph, &[0, 0, 1, 1], 2, 0).unwrap();

        // Act and assert: same verdict on repeated runs.
        assert!(check_partition(&graph, &regions, 0, true).is_ok());
        assert!(check_partition(&graph, &regions, 0, true).is_ok());
    }

    #[test]
    fn test_detects_label_mismatch() {
        // Arrange
        let mut graph = path_graph(vec![1; 4], vec![0; 4]);
        let regions = regions_from_labels(&mut graph, &[0, 0, 1, 1], 2, 0).unwrap();
        graph.assign(0, 1);

        // Act
        let violations = check_partition(&graph, &regions, 0, false).unwrap_err();

        // Assert
        assert_eq!(
            violations,
            vec![Violation::LabelMismatch { area: 0, label: Some(1), region: 0 }]
        );
    }

    #[test]
    fn test_detects_duplicate_membership() {
        // Arrange: both regions claim the only area.
        let mut graph = path_graph(vec![1], vec![0]);
        let first = Region::new(0, 0, 0, &mut graph);
        let second = Region::new(1, 0, 0, &mut graph);
        let regions = vec![first, second];

        // Act
        let violations = check_partition(&graph, &regions, 0, true).unwrap_err();

        // Assert
        assert!(violations.contains(&Violation::DuplicateMembership { area: 0 }));
    }

    #[test]
    fn test_detects_missing_area() {
        // Arrange: one region covers area 0, area 1 stays unassigned.
        let mut graph = path_graph(vec![1, 1], vec![0, 0]);
        let regions = vec![Region::new(0, 0, 0, &mut graph)];

        // Act
        let violations = check_partition(&graph, &regions, 0, false).unwrap_err();

        // Assert
        assert_eq!(violations, vec![Violation::MissingArea { area: 1 }]);
    }

    #[test]
    fn test_detects_disconnected_region() {
        // Arrange
        let mut graph = path_graph(vec![1; 3], vec![0; 3]);
        let regions = regions_from_labels(&mut graph, &[0, 1, 0], 2, 0).unwrap();

        // Act
        let violations = check_partition(&graph, &regions, 0, false).unwrap_err();

        // Assert
        assert_eq!(violations, vec![Violation::DisconnectedRegion { region: 0 }]);
    }

    #[test]
    fn test_detects_region_below_threshold() {
        // Arrange
        let mut graph = path_graph(vec![1; 3], vec![0; 3]);
        let regions = regions_from_labels(&mut graph, &[0, 0, 1], 2, 3).unwrap();

        // Act
        let violations = check_partition(&graph, &regions, 3, true).unwrap_err();

        // Assert
        assert!(violations.contains(&Violation::BelowThreshold {
            region: 0,
            extensive_sum: 2,
            threshold: 3,
        }));
        assert!(violations.contains(&Violation::BelowThreshold {
            region: 1,
            extensive_sum: 1,
            threshold: 3,
        }));
    }

    #[test]
    fn test_detects_stale_aggregates() {
        // Arrange: regions built against one attribute vector, validated
        // against a graph with a different one.
        let mut build_graph = path_graph(vec![1; 3], vec![0, 0, 0]);
        let regions = regions_from_labels(&mut build_graph, &[0, 0, 1], 2, 0).unwrap();
        let mut other_graph = path_graph(vec![1; 3], vec![5, 9, 0]);
        for (area, &label) in [0, 0, 1].iter().enumerate() {
            other_graph.assign(area, label);
        }

        // Act
        let violations = check_partition(&other_graph, &regions, 0, false).unwrap_err();

        // Assert
        assert_eq!(violations, vec![Violation::AggregateMismatch { region: 0 }]);
    }
}

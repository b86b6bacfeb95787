use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sprs::io::{read_matrix_market, IoError};
use sprs::num_kinds::Pattern;
use sprs::TriMat;

use crate::algorithms::Error;
use crate::region::Region;

/// Read a Matrix Market file and output per-area neighbor lists.
///
/// Every stored entry becomes an undirected edge; self-loops are dropped
/// and the lists come back sorted and deduplicated. Entry values are
/// ignored: adjacency is a yes/no relation here.
pub fn read_matrix_market_as_neighbors(file_path: &Path) -> Result<Vec<Vec<usize>>, IoError> {
    let tri_matrix: TriMat<Pattern> = read_matrix_market(file_path)?;
    let num_of_areas = tri_matrix.rows().max(tri_matrix.cols());

    let mut neighbors = vec![Vec::new(); num_of_areas];
    for (_value, (row, col)) in tri_matrix.triplet_iter() {
        if row == col {
            continue;
        }
        neighbors[row].push(col);
        neighbors[col].push(row);
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }
    Ok(neighbors)
}

/// Write the label array to a file, one area per line.
pub fn write_assignment_to_file(labels: &[usize], file_name: &str) -> std::io::Result<()> {
    let mut file = File::create(file_name)?;
    for (area_id, region) in labels.iter().enumerate() {
        writeln!(file, "area {} => region {}", area_id, region)?;
    }
    Ok(())
}

/// The persisted form of a solved partition: region index mapped to the
/// ordered list of its area ids. This mapping is the only state that must
/// survive a save/load round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// Number of regions (p).
    pub p_value: usize,

    /// Area ids per region, ascending within each region.
    pub region_assignments: BTreeMap<usize, Vec<usize>>,
}

impl Solution {
    pub fn from_regions(regions: &[Region]) -> Self {
        let region_assignments = regions
            .iter()
            .map(|region| (region.index(), region.sorted_area_ids()))
            .collect();
        Solution {
            p_value: regions.len(),
            region_assignments,
        }
    }

    /// Expand the mapping back into a label array over `num_of_areas`
    /// areas, rejecting region indices outside `0..p_value`, out-of-range
    /// or doubly-assigned area ids, and incomplete covers.
    pub fn into_labels(&self, num_of_areas: usize) -> Result<Vec<usize>, Error> {
        const UNSET: usize = usize::MAX;
        let mut labels = vec![UNSET; num_of_areas];

        for (&region, ids) in &self.region_assignments {
            if region >= self.p_value {
                return Err(Error::InvalidAssignment {
                    area: ids.first().copied().unwrap_or(0),
                    region,
                });
            }
            if ids.is_empty() {
                return Err(Error::EmptyRegion { region });
            }
            for &area in ids {
                if area >= num_of_areas || labels[area] != UNSET {
                    return Err(Error::InvalidAssignment { area, region });
                }
                labels[area] = region;
            }
        }

        if let Some(area) = labels.iter().position(|&label| label == UNSET) {
            return Err(Error::UncoveredArea { area });
        }
        Ok(labels)
    }
}

/// Write a solution as JSON.
pub fn write_solution_json(solution: &Solution, file_name: &str) -> std::io::Result<()> {
    let file = File::create(file_name)?;
    serde_json::to_writer_pretty(file, solution).map_err(std::io::Error::from)?;
    Ok(())
}

/// Read a solution back from JSON.
pub fn read_solution_json(file_name: &str) -> std::io::Result<Solution> {
    let file = File::open(file_name)?;
    let solution = serde_json::from_reader(file).map_err(std::io::Error::from)?;
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use itertools::assert_equal;
    use tempfile::tempdir;

    use super::*;
    use crate::graph::AreaGraph;
    use crate::region::regions_from_labels;

    fn create_mock_file(dir: &Path, filename: &str, content: &str) -> String {
        let file_path = dir.join(filename);
        let mut file = File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_read_matrix_market_as_neighbors() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "%%MatrixMarket matrix coordinate integer general\n%\n4 4 4\n1 2 1\n2 3 1\n3 4 1\n2 2 7\n";
        let mtx_path = create_mock_file(temp_dir.path(), "adjacency.mtx", content);

        // Act
        let neighbors = read_matrix_market_as_neighbors(Path::new(&mtx_path)).unwrap();

        // Assert: the diagonal entry is dropped, everything else is
        // symmetric.
        assert_eq!(neighbors.len(), 4);
        assert_equal(neighbors[0].iter().copied(), [1]);
        assert_equal(neighbors[1].iter().copied(), [0, 2]);
        assert_equal(neighbors[2].iter().copied(), [1, 3]);
        assert_equal(neighbors[3].iter().copied(), [2]);

        Ok(())
    }

    #[test]
    fn test_solution_round_trip() -> Result<(), std::io::Error> {
        // Arrange
        let mut graph = AreaGraph::from_parts(
            vec![vec![1], vec![2], vec![3], vec![]],
            vec![1; 4],
            vec![3, 1, 4, 1],
        )
        .unwrap();
        let regions = regions_from_labels(&mut graph, &[0, 0, 1, 1], 2, 0).unwrap();
        let solution = Solution::from_regions(&regions);
        let temp_dir = tempdir()?;
        let json_path = temp_dir
            .path()
            .join("solution.json")
            .to_str()
            .unwrap()
            .to_string();

        // Act
        write_solution_json(&solution, &json_path)?;
        let reloaded = read_solution_json(&json_path)?;

        // Assert
        assert_eq!(reloaded, solution);
        assert_eq!(reloaded.into_labels(4).unwrap(), vec![0, 0, 1, 1]);

        Ok(())
    }

    #[test]
    fn test_into_labels_rejects_incomplete_cover() {
        // Arrange
        let mut region_assignments = BTreeMap::new();
        region_assignments.insert(0, vec![0, 1]);
        let solution = Solution { p_value: 1, region_assignments };

        // Act
        let result = solution.into_labels(3);

        // Assert
        assert!(matches!(result, Err(Error::UncoveredArea { area: 2 })));
    }

    #[test]
    fn test_into_labels_rejects_doubly_assigned_area() {
        // Arrange
        let mut region_assignments = BTreeMap::new();
        region_assignments.insert(0, vec![0, 1]);
        region_assignments.insert(1, vec![1]);
        let solution = Solution { p_value: 2, region_assignments };

        // Act
        let result = solution.into_labels(2);

        // Assert
        assert!(matches!(result, Err(Error::InvalidAssignment { area: 1, region: 1 })));
    }

    #[test]
    fn test_write_assignment_to_file() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let out_path = temp_dir
            .path()
            .join("assignment.txt")
            .to_str()
            .unwrap()
            .to_string();

        // Act
        write_assignment_to_file(&[0, 0, 1], &out_path)?;

        // Assert
        let content = std::fs::read_to_string(&out_path)?;
        assert_eq!(content, "area 0 => region 0\narea 1 => region 0\narea 2 => region 1\n");

        Ok(())
    }
}

use num_traits::ToPrimitive;

/// Total extensive attribute carried by each region of a labelled
/// partition. Labels outside `0..num_of_regions` are ignored.
pub fn compute_region_loads(
    labels: &[usize],
    num_of_regions: usize,
    extensive_attrs: &[i64],
) -> Vec<i64> {
    let mut loads = vec![0; num_of_regions];
    for (&region, &attr) in labels.iter().zip(extensive_attrs) {
        if region < num_of_regions {
            loads[region] += attr;
        }
    }
    loads
}

/// Imbalance of a set of region loads: the largest relative deviation
/// above the ideal (mean) load. 0.0 means perfectly balanced regions.
pub fn imbalance_from_region_loads(num_of_regions: usize, loads: &[i64]) -> f64 {
    if num_of_regions == 0 {
        return 0.0;
    }
    let total: i64 = loads.iter().sum();
    let ideal = total.to_f64().unwrap_or(0.0) / num_of_regions.to_f64().unwrap_or(1.0);
    if ideal == 0.0 {
        return 0.0;
    }
    loads
        .iter()
        .map(|load| (load.to_f64().unwrap_or(0.0) - ideal) / ideal)
        .fold(0.0_f64, f64::max)
}

/// Imbalance of the given labelled partition.
pub fn imbalance(num_of_regions: usize, labels: &[usize], extensive_attrs: &[i64]) -> f64 {
    let loads = compute_region_loads(labels, num_of_regions, extensive_attrs);
    imbalance_from_region_loads(num_of_regions, &loads)
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;
    use itertools::assert_equal;

    use crate::imbalance::{compute_region_loads, imbalance};

    #[test]
    fn test_compute_region_loads() {
        // Arrange
        let labels = [0, 0, 1, 1];
        let extensive_attrs = vec![4, 7, 5, 2];
        let num_of_regions = 2;

        // Act
        let loads = compute_region_loads(&labels, num_of_regions, &extensive_attrs);

        // Assert
        assert_equal(loads, [11, 7]);
    }

    #[test]
    fn test_imbalance_of_uneven_regions() {
        // Arrange
        let labels = [0, 0, 1, 1];
        let extensive_attrs = vec![3, 3, 2, 2];
        let num_of_regions = 2;

        // Act
        let imb = imbalance(num_of_regions, &labels, &extensive_attrs);

        // Assert
        assert_ulps_eq!(imb, 0.2);
    }

    #[test]
    fn test_imbalance_of_balanced_regions_is_zero() {
        // Arrange
        let labels = [0, 1, 0, 1];
        let extensive_attrs = vec![2, 3, 3, 2];

        // Act
        let imb = imbalance(2, &labels, &extensive_attrs);

        // Assert
        assert_ulps_eq!(imb, 0.0);
    }
}

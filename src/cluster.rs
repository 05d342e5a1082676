use crate::detector::Line;

/// Sort lines by rho ascending, the order clustering relies on.
pub fn sort_by_rho(lines: &mut [Line]) {
    lines.sort_by(|a, b| a.rho.total_cmp(&b.rho));
}

/// Partition rho-sorted lines into runs of neighbours.
///
/// A new cluster starts whenever the rho gap between consecutive lines
/// exceeds `tol`. Returns the start index of each cluster plus a terminal
/// sentinel equal to `lines.len()`; empty input yields an empty boundary
/// list. Idempotent for an already-clustered sorted input.
pub fn cluster_boundaries(lines: &[Line], tol: f64) -> Vec<usize> {
    if lines.is_empty() {
        return Vec::new();
    }
    let mut boundaries = vec![0];
    for i in 1..lines.len() {
        if (lines[i].rho - lines[i - 1].rho).abs() > tol {
            boundaries.push(i);
        }
    }
    boundaries.push(lines.len());
    boundaries
}

/// Pick each cluster's representative line: the element at the median index
/// of its run. The median index is robust to stray votes at a cluster's
/// edges and avoids averaging theta, a circular quantity.
pub fn select_medians(lines: &[Line], boundaries: &[usize]) -> Vec<Line> {
    boundaries
        .windows(2)
        .map(|pair| lines[(pair[0] + pair[1]) / 2])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(theta_deg: f64, rho: f64) -> Line {
        Line { theta_deg, rho }
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_boundaries(&[], 2.0).is_empty());
        assert!(select_medians(&[], &[]).is_empty());
    }

    #[test]
    fn test_single_line_single_cluster() {
        let lines = vec![line(90.0, 5.0)];
        let boundaries = cluster_boundaries(&lines, 2.0);
        assert_eq!(boundaries, vec![0, 1]);
        assert_eq!(select_medians(&lines, &boundaries), lines);
    }

    #[test]
    fn test_gap_splits_clusters() {
        let lines = vec![
            line(90.0, 1.0),
            line(91.0, 2.0),
            line(90.0, 3.0),
            line(90.0, 20.0),
            line(89.0, 21.0),
        ];
        let boundaries = cluster_boundaries(&lines, 2.0);
        assert_eq!(boundaries, vec![0, 3, 5]);
        let medians = select_medians(&lines, &boundaries);
        assert_eq!(medians.len(), 2);
        // Median of [0, 3) is index 1; median of [3, 5) is index 4.
        assert_eq!(medians[0], line(91.0, 2.0));
        assert_eq!(medians[1], line(89.0, 21.0));
    }

    #[test]
    fn test_clustering_is_idempotent() {
        let mut lines = vec![
            line(10.0, 4.0),
            line(10.0, 0.0),
            line(12.0, 30.0),
            line(11.0, 5.0),
        ];
        sort_by_rho(&mut lines);
        let first = cluster_boundaries(&lines, 6.0);
        let second = cluster_boundaries(&lines, 6.0);
        assert_eq!(first, second);
        assert_eq!(first, vec![0, 3, 4]);
    }

    #[test]
    fn test_every_member_within_tol_of_neighbour() {
        let mut lines: Vec<Line> = (0..8).map(|i| line(45.0, i as f64 * 1.5)).collect();
        sort_by_rho(&mut lines);
        let boundaries = cluster_boundaries(&lines, 2.0);
        assert_eq!(boundaries, vec![0, lines.len()]);
        for pair in lines.windows(2) {
            assert!((pair[1].rho - pair[0].rho).abs() <= 2.0);
        }
    }
}

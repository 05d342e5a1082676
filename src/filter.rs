use log::debug;
use nalgebra::DMatrix;

use crate::hough::Accumulator;

/// Accumulator restricted to theta bins near the dominant angle.
///
/// Slicing renumbers rows, so the absolute theta bin of each kept row is
/// carried alongside the grid.
#[derive(Debug, Clone)]
pub struct FilteredAccumulator {
    pub grid: DMatrix<f32>,
    /// Absolute theta bin per row; after folding, bins >= n_theta denote
    /// the +180 degree relabeling of the negative-rho half.
    pub theta_bins: Vec<usize>,
}

/// Intervals (half-open) covering [inf, sup) on a circular axis of length
/// `max`, wrapping at the 0/max boundary instead of clipping.
pub fn circular_interval(inf: i64, sup: i64, max: usize) -> Vec<(usize, usize)> {
    let max = max as i64;
    if sup < inf {
        return vec![(0, sup as usize), (inf as usize, max as usize)];
    }
    if sup > max {
        return vec![(0, (sup - max) as usize), (inf as usize, max as usize)];
    }
    if inf < 0 {
        return vec![(0, sup as usize), ((max + inf) as usize, max as usize)];
    }
    vec![(inf as usize, sup as usize)]
}

/// Threshold the accumulator and keep only theta rows within `angle_error`
/// bins of the dominant angle (the row with the largest vote sum), treating
/// the theta axis as circular.
///
/// Returns `None` when no cell clears the threshold; that is the expected
/// no-rows outcome, not a failure.
pub fn filter_lines(
    acc: &Accumulator,
    threshold: f32,
    angle_error: usize,
) -> Option<FilteredAccumulator> {
    let mut grid = acc.grid.clone();
    for v in grid.iter_mut() {
        if *v <= threshold {
            *v = 0.0;
        }
    }

    let sums: Vec<f32> = (0..grid.nrows()).map(|r| grid.row(r).sum()).collect();
    let (dominant, &best) = sums
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if best <= 0.0 {
        debug!("no accumulator cell above threshold {threshold}");
        return None;
    }

    let intervals = circular_interval(
        dominant as i64 - angle_error as i64,
        dominant as i64 + angle_error as i64 + 1,
        acc.n_theta,
    );
    let theta_bins: Vec<usize> = intervals
        .iter()
        .flat_map(|&(inf, sup)| inf..sup)
        .collect();
    if theta_bins.is_empty() {
        return None;
    }

    let mut kept = DMatrix::zeros(theta_bins.len(), grid.ncols());
    for (row, &bin) in theta_bins.iter().enumerate() {
        kept.row_mut(row).copy_from(&grid.row(bin));
    }

    debug!(
        "dominant theta bin {dominant}, kept {} theta bins",
        theta_bins.len()
    );
    Some(FilteredAccumulator {
        grid: kept,
        theta_bins,
    })
}

/// Fold the signed rho axis onto its positive half.
///
/// The rho axis splits at its midpoint into a negative and a positive half;
/// the folded grid stacks the positive-half rows above the column-reversed
/// negative-half rows, relabeling the latter's theta bins by +180 degrees.
/// This uses the Hough duality (theta, rho) == (theta + 180, -rho), so the
/// folded grid has twice the rows, half the columns, and column index c maps
/// to rho = c * step_rho.
pub fn fold_rhos(filtered: &FilteredAccumulator, n_half: usize, n_theta: usize) -> FilteredAccumulator {
    let nrows = filtered.grid.nrows();
    let mut grid = DMatrix::zeros(2 * nrows, n_half);

    for row in 0..nrows {
        for c in 0..n_half {
            // Positive half, ascending rho.
            grid[(row, c)] = filtered.grid[(row, n_half + c)];
            // Negative half, reversed so rho magnitude ascends.
            grid[(nrows + row, c)] = filtered.grid[(row, n_half - 1 - c)];
        }
    }

    let mut theta_bins = filtered.theta_bins.clone();
    theta_bins.extend(filtered.theta_bins.iter().map(|&b| b + n_theta));

    FilteredAccumulator { grid, theta_bins }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hough::{build_accumulator, max_displacement};
    use crate::regions::Region;

    fn point_region(cx: u32, cy: u32) -> Region {
        Region {
            x0: cx,
            y0: cy,
            x1: cx,
            y1: cy,
            centroid: (cx as f64, cy as f64),
            pixel_count: 1,
        }
    }

    #[test]
    fn test_circular_interval_interior() {
        assert_eq!(circular_interval(10, 17, 180), vec![(10, 17)]);
    }

    #[test]
    fn test_circular_interval_wraps_below_zero() {
        // Dominant bin 0, error 3 => [-3, 4) wraps to {0..3} and {177..179}.
        let intervals = circular_interval(-3, 4, 180);
        assert_eq!(intervals, vec![(0, 4), (177, 180)]);
        let bins: Vec<usize> = intervals.iter().flat_map(|&(a, b)| a..b).collect();
        assert_eq!(bins, vec![0, 1, 2, 3, 177, 178, 179]);
    }

    #[test]
    fn test_circular_interval_wraps_above_max() {
        assert_eq!(circular_interval(178, 183, 180), vec![(0, 3), (178, 180)]);
    }

    #[test]
    fn test_filter_below_threshold_is_none() {
        let acc = build_accumulator(&[point_region(5, 5)], 20, 20, 1.0, 1.0, max_displacement);
        // Single region contributes at most one vote per cell.
        assert!(filter_lines(&acc, 10.0, 3).is_none());
    }

    #[test]
    fn test_filter_keeps_window_around_dominant() {
        // Several collinear regions along the horizontal centre line produce
        // a dominant vertical-normal angle near theta = 90.
        let regions: Vec<Region> = (0..10).map(|i| point_region(2 * i, 10)).collect();
        let acc = build_accumulator(&regions, 20, 20, 1.0, 1.0, max_displacement);
        let filtered = filter_lines(&acc, 5.0, 3).unwrap();
        assert_eq!(filtered.theta_bins.len(), 7);
        assert_eq!(filtered.grid.nrows(), 7);
        assert!(filtered.theta_bins.contains(&90));
        // All surviving cells cleared the threshold.
        assert!(filtered.grid.iter().all(|&v| v == 0.0 || v > 5.0));
    }

    #[test]
    fn test_fold_doubles_thetas_and_halves_rhos() {
        let regions: Vec<Region> = (0..10).map(|i| point_region(2 * i, 10)).collect();
        let acc = build_accumulator(&regions, 20, 20, 1.0, 1.0, max_displacement);
        let filtered = filter_lines(&acc, 5.0, 3).unwrap();
        let folded = fold_rhos(&filtered, acc.n_half, acc.n_theta);
        assert_eq!(folded.grid.nrows(), 2 * filtered.grid.nrows());
        assert_eq!(folded.grid.ncols(), acc.n_half);
        assert_eq!(folded.theta_bins.len(), 2 * filtered.theta_bins.len());
        let (lo, hi) = folded.theta_bins.split_at(filtered.theta_bins.len());
        for (a, b) in lo.iter().zip(hi) {
            assert_eq!(a + acc.n_theta, *b);
        }
        // Vote mass is preserved by the fold.
        let before: f32 = filtered.grid.iter().sum();
        let after: f32 = folded.grid.iter().sum();
        assert!((before - after).abs() < 1e-3);
    }
}

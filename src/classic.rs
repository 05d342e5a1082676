use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use log::debug;

use crate::cluster::{cluster_boundaries, select_medians, sort_by_rho};
use crate::detector::{DetectorConfig, Line};
use crate::mask::BinaryMask;

/// Classic pipeline result: cluster representatives plus the pre-filter
/// candidate set.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClassicOutcome {
    pub medians: Vec<Line>,
    pub raw_lines: Vec<Line>,
}

/// Pixel-based Hough baseline.
///
/// Raw candidates come from a standard Hough transform on the mask; a
/// uniform angle spread means noise rather than rows and exits early, then
/// a modal-angle filter and the shared rho clustering produce one median
/// line per row.
pub(crate) fn run(
    mask: &BinaryMask,
    config: &DetectorConfig,
    clustering_tol: f64,
) -> ClassicOutcome {
    let options = LineDetectionOptions {
        vote_threshold: config.threshold.max(0.0) as u32,
        suppression_radius: config.suppression_radius,
    };
    let polar = detect_lines(mask.as_gray(), options);
    let raw_lines: Vec<Line> = polar
        .iter()
        .map(|line| centre_relative(line, mask.width(), mask.height()))
        .collect();

    if raw_lines.is_empty() {
        debug!("pixel hough found no candidate lines");
        return ClassicOutcome::default();
    }
    let thetas: Vec<f64> = raw_lines.iter().map(|l| l.theta_deg).collect();
    if angles_are_uniform(&thetas, config.uniform_significance) {
        debug!("candidate angles are uniformly spread, treating as noise");
        return ClassicOutcome {
            medians: Vec::new(),
            raw_lines,
        };
    }

    let mut filtered = filter_by_modal_angle(&raw_lines, config.step_theta);
    sort_by_rho(&mut filtered);

    let boundaries = cluster_boundaries(&filtered, clustering_tol);
    let medians = select_medians(&filtered, &boundaries);

    ClassicOutcome { medians, raw_lines }
}

/// Convert an origin-based polar line (r measured from the top-left corner)
/// to the centre-relative rho convention the detector reports in.
fn centre_relative(line: &PolarLine, width: u32, height: u32) -> Line {
    let theta_deg = line.angle_in_degrees as f64;
    let theta = theta_deg.to_radians();
    let rho =
        line.r as f64 - (width as f64 / 2.0 * theta.cos() + height as f64 / 2.0 * theta.sin());
    Line { theta_deg, rho }
}

/// Keep lines whose theta falls within one `step_theta` of the modal
/// histogram bucket over [0, 180).
fn filter_by_modal_angle(lines: &[Line], step_theta: f64) -> Vec<Line> {
    let n_bins = (180.0 / step_theta).ceil() as usize;
    let bin_width = 180.0 / n_bins as f64;

    let mut counts = vec![0usize; n_bins];
    for line in lines {
        let bin = ((line.theta_deg / bin_width) as usize).min(n_bins - 1);
        counts[bin] += 1;
    }
    let mode = counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, &c)| c)
        .map(|(bin, _)| bin)
        .unwrap_or(0);
    let mode_edge = mode as f64 * bin_width;

    lines
        .iter()
        .filter(|l| l.theta_deg >= mode_edge - step_theta && l.theta_deg <= mode_edge + step_theta)
        .copied()
        .collect()
}

/// One-sample Kolmogorov-Smirnov statistic of sorted values in [0, 1]
/// against the uniform distribution.
fn ks_uniform_statistic(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let below = v - i as f64 / n;
            let above = (i + 1) as f64 / n - v;
            below.max(above)
        })
        .fold(0.0, f64::max)
}

/// Test whether min-max-normalized angles look uniformly distributed.
///
/// A small KS statistic means the empirical distribution hugs the uniform
/// CDF, so the statistic itself is compared against the significance
/// cutoff. Fewer than three distinct-spread samples never count as uniform.
pub(crate) fn angles_are_uniform(thetas: &[f64], significance: f64) -> bool {
    if thetas.len() < 3 {
        return false;
    }
    let min = thetas.iter().copied().fold(f64::INFINITY, f64::min);
    let max = thetas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < f64::EPSILON {
        return false;
    }
    let mut normalized: Vec<f64> = thetas.iter().map(|t| (t - min) / (max - min)).collect();
    normalized.sort_by(f64::total_cmp);
    ks_uniform_statistic(&normalized) < significance
}

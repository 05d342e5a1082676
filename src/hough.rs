use log::debug;
use nalgebra::DMatrix;

use crate::regions::Region;

/// Policy mapping a region's (width, height) to the half-width, in rho bins,
/// of the window its vote is spread across.
pub type DisplacementFn = fn(u32, u32) -> u32;

/// Half of the larger box side. Default vote-spread policy.
pub fn max_displacement(width: u32, height: u32) -> u32 {
    (width.max(height) as f64 / 2.0).round() as u32
}

/// Quarter of the box perimeter-ish: (width + height) / 4.
pub fn mean_displacement(width: u32, height: u32) -> u32 {
    ((width + height) as f64 / 4.0).round() as u32
}

/// Weighted (theta, rho) vote grid built from regions rather than pixels.
///
/// Rows are theta bins covering [0, 180) in `step_theta` increments; columns
/// are rho bins covering [-diagonal, diagonal] in `step_rho` increments, with
/// an even column count so the axis splits exactly at rho = 0.
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub grid: DMatrix<f32>,
    pub n_theta: usize,
    /// Bins per rho half-axis; total columns = 2 * n_half.
    pub n_half: usize,
    pub step_theta: f64,
    pub step_rho: f64,
    pub diagonal: f64,
}

impl Accumulator {
    pub fn theta_deg(&self, theta_bin: usize) -> f64 {
        theta_bin as f64 * self.step_theta
    }

    /// Signed rho value at a column of the unfolded grid.
    pub fn rho_at(&self, rho_bin: usize) -> f64 {
        (rho_bin as f64 - self.n_half as f64) * self.step_rho
    }

    fn rho_bin(&self, rho: f64) -> usize {
        let bin = (rho / self.step_rho).round() as i64 + self.n_half as i64;
        bin.clamp(0, 2 * self.n_half as i64 - 1) as usize
    }
}

/// Build the region-weighted Hough accumulator.
///
/// Each region deposits, for every theta bin, one vote spread across a
/// symmetric rho window centred on its centroid's projection. The window
/// half-width comes from the displacement policy and models the positional
/// uncertainty of a blob roughly its own size. Centroids are taken relative
/// to the image centre. Pure function of its inputs.
pub fn build_accumulator(
    regions: &[Region],
    width: u32,
    height: u32,
    step_theta: f64,
    step_rho: f64,
    displacement: DisplacementFn,
) -> Accumulator {
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
    let n_theta = (180.0 / step_theta).ceil() as usize;
    let n_half = (diagonal / step_rho).ceil() as usize + 1;

    let mut acc = Accumulator {
        grid: DMatrix::zeros(n_theta, 2 * n_half),
        n_theta,
        n_half,
        step_theta,
        step_rho,
        diagonal,
    };

    let (cos_thetas, sin_thetas): (Vec<f64>, Vec<f64>) = (0..n_theta)
        .map(|t| {
            let rad = (t as f64 * step_theta).to_radians();
            (rad.cos(), rad.sin())
        })
        .unzip();

    let n_rho = 2 * n_half;
    for region in regions {
        let spread = displacement(region.width(), region.height()) as i64;
        let cx = region.centroid.0 - width as f64 / 2.0;
        let cy = region.centroid.1 - height as f64 / 2.0;
        for t in 0..n_theta {
            let rho = cy * sin_thetas[t] + cx * cos_thetas[t];
            let centre = acc.rho_bin(rho) as i64;
            let lo = (centre - spread).max(0) as usize;
            let hi = ((centre + spread) as usize).min(n_rho - 1);
            for r in lo..=hi {
                acc.grid[(t, r)] += 1.0;
            }
        }
    }

    debug!(
        "accumulator built: {} regions, {}x{} bins, diagonal {:.1}",
        regions.len(),
        n_theta,
        n_rho,
        diagonal
    );
    acc
}

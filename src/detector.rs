use image::{DynamicImage, GrayImage};
use log::{debug, info};

use crate::classic;
use crate::cluster::{cluster_boundaries, select_medians};
use crate::error::{DetectError, Result};
use crate::filter::{filter_lines, fold_rhos};
use crate::hough::{build_accumulator, max_displacement, DisplacementFn};
use crate::mask::BinaryMask;
use crate::regions::{extract_regions, LabelMap};
use crate::segment::Segmenter;

/// A detected row line in polar form: angle in degrees and signed
/// perpendicular distance from the image centre.
///
/// Theta lies in [0, 180) before rho folding and [0, 360) after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub theta_deg: f64,
    pub rho: f64,
}

impl Line {
    /// Canonical positive-rho form via the Hough duality
    /// (theta, rho) == (theta + 180, -rho). A no-op when rho >= 0.
    pub fn fold(self) -> Line {
        if self.rho < 0.0 {
            Line {
                theta_deg: (self.theta_deg + 180.0) % 360.0,
                rho: -self.rho,
            }
        } else {
            self
        }
    }
}

/// Rho gap under which two candidate lines belong to the same physical row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusteringTol {
    Fixed(f64),
    /// Use the mean crop size measured on the current mask, letting row
    /// spacing adapt to the apparent crop width.
    CropSize,
}

/// Which of the two Hough pipelines to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Region-weighted accumulator over connected components.
    RegionWeighted,
    /// Classical pixel-based Hough baseline.
    Classic,
}

/// Detector configuration. Validated once in [`CropRowDetector::new`];
/// immutable afterwards, so one detector can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub variant: Variant,
    /// Theta quantization in degrees over [0, 180).
    pub step_theta: f64,
    /// Rho quantization in pixels.
    pub step_rho: f64,
    /// Minimum accumulator weight (or vote count) for a candidate line.
    pub threshold: f32,
    /// Tolerance, in theta bins, around the dominant angle.
    pub angle_error: usize,
    pub clustering_tol: ClusteringTol,
    /// KS-statistic cutoff below which the classic variant treats the angle
    /// spread as uniform noise and exits early.
    pub uniform_significance: f64,
    /// Non-maximum suppression radius for the pixel Hough baseline.
    pub suppression_radius: u32,
    /// Vote-spread policy for the region-weighted accumulator.
    pub displacement: DisplacementFn,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            variant: Variant::RegionWeighted,
            step_theta: 1.0,
            step_rho: 1.0,
            threshold: 10.0,
            angle_error: 3,
            clustering_tol: ClusteringTol::Fixed(2.0),
            uniform_significance: 0.1,
            suppression_radius: 8,
            displacement: max_displacement,
        }
    }
}

/// Per-call auxiliary outputs to attach to the [`Detection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Attach the binary mask the detection ran on.
    pub return_crop_mask: bool,
    /// Attach the connected-component label map.
    pub return_label_map: bool,
    /// Classic variant only: attach the pre-filter candidate lines.
    pub return_raw_lines: bool,
}

/// Result of one detection call: one representative line per crop row,
/// in rho order, plus requested auxiliary outputs.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub lines: Vec<Line>,
    /// Mean of (box width + height) / 2 over foreground regions; `None`
    /// when the mask had no foreground.
    pub mean_crop_size: Option<f64>,
    pub crop_mask: Option<GrayImage>,
    pub label_map: Option<LabelMap>,
    pub raw_lines: Option<Vec<Line>>,
}

/// Crop-row detector over binary vegetation masks.
///
/// Holds configuration only; every scalar the stages communicate through
/// (diagonal length, mean crop size) lives in the call frame, so a shared
/// instance is safe to use from multiple threads.
#[derive(Debug, Clone)]
pub struct CropRowDetector {
    config: DetectorConfig,
}

impl CropRowDetector {
    /// Validate the configuration and build a detector.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        if !(config.step_theta > 0.0 && config.step_theta <= 180.0) {
            return Err(DetectError::Config(format!(
                "step_theta must be in (0, 180], got {}",
                config.step_theta
            )));
        }
        if config.step_rho <= 0.0 {
            return Err(DetectError::Config(format!(
                "step_rho must be positive, got {}",
                config.step_rho
            )));
        }
        if config.threshold < 0.0 {
            return Err(DetectError::Config(format!(
                "threshold must be non-negative, got {}",
                config.threshold
            )));
        }
        let n_theta = (180.0 / config.step_theta).ceil() as usize;
        if 2 * config.angle_error + 1 > n_theta {
            return Err(DetectError::Config(format!(
                "angle_error {} spans more than the {} available theta bins",
                config.angle_error, n_theta
            )));
        }
        if !(config.uniform_significance > 0.0 && config.uniform_significance < 1.0) {
            return Err(DetectError::Config(format!(
                "uniform_significance must be in (0, 1), got {}",
                config.uniform_significance
            )));
        }
        if let ClusteringTol::Fixed(tol) = config.clustering_tol {
            if tol < 0.0 {
                return Err(DetectError::Config(format!(
                    "clustering tolerance must be non-negative, got {tol}"
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect crop rows on a precomputed binary mask.
    ///
    /// An empty foreground, no votes above threshold, or (classic variant)
    /// a uniform angle spread all yield an empty line list.
    pub fn detect(&self, mask: &BinaryMask, options: &DetectOptions) -> Detection {
        let extraction = extract_regions(mask);
        let mean_crop_size = extraction.mean_crop_size();

        let mut detection = Detection {
            mean_crop_size,
            ..Detection::default()
        };
        if options.return_crop_mask {
            detection.crop_mask = Some(mask.as_gray().clone());
        }
        if options.return_label_map {
            detection.label_map = Some(extraction.label_map.clone());
        }

        if extraction.regions.is_empty() {
            debug!("mask has no foreground regions");
            return detection;
        }

        match self.config.variant {
            Variant::RegionWeighted => {
                detection.lines =
                    self.detect_region_weighted(mask, &extraction.regions, mean_crop_size);
            }
            Variant::Classic => {
                let tol = self.resolve_clustering_tol(mean_crop_size);
                let outcome = classic::run(mask, &self.config, tol);
                detection.lines = outcome.medians;
                if options.return_raw_lines {
                    detection.raw_lines = Some(outcome.raw_lines);
                }
            }
        }
        info!("detected {} crop rows", detection.lines.len());
        detection
    }

    /// Run the external segmenter, then detect on its mask.
    ///
    /// Segmenter failures propagate unchanged; no retries, since detection
    /// is idempotent and cheap for the caller to re-invoke.
    pub fn detect_image<S: Segmenter>(
        &self,
        segmenter: &S,
        image: &DynamicImage,
        options: &DetectOptions,
    ) -> Result<Detection> {
        let mask = segmenter
            .segment(image)
            .map_err(|e| DetectError::Segmentation(Box::new(e)))?;
        Ok(self.detect(&BinaryMask::new(mask), options))
    }

    fn detect_region_weighted(
        &self,
        mask: &BinaryMask,
        regions: &[crate::regions::Region],
        mean_crop_size: Option<f64>,
    ) -> Vec<Line> {
        let cfg = &self.config;
        let acc = build_accumulator(
            regions,
            mask.width(),
            mask.height(),
            cfg.step_theta,
            cfg.step_rho,
            cfg.displacement,
        );

        let Some(filtered) = filter_lines(&acc, cfg.threshold, cfg.angle_error) else {
            return Vec::new();
        };
        let folded = fold_rhos(&filtered, acc.n_half, acc.n_theta);

        // Surviving cells in rho-major order are already sorted by rho.
        let mut lines = Vec::new();
        for c in 0..folded.grid.ncols() {
            for r in 0..folded.grid.nrows() {
                if folded.grid[(r, c)] > 0.0 {
                    lines.push(Line {
                        theta_deg: folded.theta_bins[r] as f64 * cfg.step_theta,
                        rho: c as f64 * cfg.step_rho,
                    });
                }
            }
        }

        let tol = self.resolve_clustering_tol(mean_crop_size);
        let boundaries = cluster_boundaries(&lines, tol);
        select_medians(&lines, &boundaries)
    }

    pub(crate) fn resolve_clustering_tol(&self, mean_crop_size: Option<f64>) -> f64 {
        match self.config.clustering_tol {
            ClusteringTol::Fixed(tol) => tol,
            ClusteringTol::CropSize => mean_crop_size.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_negative_rho() {
        let folded = Line {
            theta_deg: 30.0,
            rho: -12.0,
        }
        .fold();
        assert_eq!(folded.theta_deg, 210.0);
        assert_eq!(folded.rho, 12.0);
    }

    #[test]
    fn test_fold_is_idempotent_on_positive_rho() {
        let line = Line {
            theta_deg: 210.0,
            rho: 12.0,
        };
        assert_eq!(line.fold(), line);
        assert_eq!(line.fold().fold(), line);
    }

    #[test]
    fn test_fold_wraps_theta() {
        let folded = Line {
            theta_deg: 200.0,
            rho: -3.0,
        }
        .fold();
        assert_eq!(folded.theta_deg, 20.0);
        assert_eq!(folded.rho, 3.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(CropRowDetector::new(DetectorConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_steps_rejected() {
        let config = DetectorConfig {
            step_theta: 0.0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            CropRowDetector::new(config),
            Err(DetectError::Config(_))
        ));

        let config = DetectorConfig {
            step_rho: -1.0,
            ..DetectorConfig::default()
        };
        assert!(CropRowDetector::new(config).is_err());
    }

    #[test]
    fn test_oversized_angle_window_rejected() {
        // 2 * 91 + 1 > 180 theta bins.
        let config = DetectorConfig {
            angle_error: 91,
            ..DetectorConfig::default()
        };
        assert!(CropRowDetector::new(config).is_err());
    }

    #[test]
    fn test_negative_fixed_tolerance_rejected() {
        let config = DetectorConfig {
            clustering_tol: ClusteringTol::Fixed(-1.0),
            ..DetectorConfig::default()
        };
        assert!(CropRowDetector::new(config).is_err());
    }

    #[test]
    fn test_crop_size_tolerance_resolution() {
        let detector = CropRowDetector::new(DetectorConfig {
            clustering_tol: ClusteringTol::CropSize,
            ..DetectorConfig::default()
        })
        .unwrap();
        assert_eq!(detector.resolve_clustering_tol(Some(7.5)), 7.5);

        let fixed = CropRowDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(fixed.resolve_clustering_tol(Some(7.5)), 2.0);
    }
}

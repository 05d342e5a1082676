use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::detector::{ClusteringTol, DetectorConfig, Variant};
use crate::hough::{max_displacement, mean_displacement};

#[derive(Parser, Debug)]
#[command(name = "crop-rows")]
#[command(version, about = "Detect crop rows in binary vegetation masks")]
pub struct Cli {
    /// Input mask image, or a directory of mask images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for CSV and mask outputs
    #[arg(short, long, default_value = "crop_rows_out")]
    pub out_dir: PathBuf,

    /// Detection pipeline to run
    #[arg(long, value_enum, default_value_t = VariantArg::RegionWeighted)]
    pub variant: VariantArg,

    /// Theta quantization in degrees
    #[arg(long, default_value_t = 1.0)]
    pub step_theta: f64,

    /// Rho quantization in pixels
    #[arg(long, default_value_t = 1.0)]
    pub step_rho: f64,

    /// Minimum accumulator weight for a candidate line
    #[arg(short, long, default_value_t = 10.0)]
    pub threshold: f32,

    /// Tolerance in theta bins around the dominant angle
    #[arg(long, default_value_t = 3)]
    pub angle_error: usize,

    /// Rho tolerance for grouping lines into one row; pass "crop" to derive
    /// it from the mean crop size
    #[arg(long, default_value = "2", value_parser = parse_clustering_tol)]
    pub clustering_tol: ClusteringTol,

    /// KS-statistic cutoff for the uniform-angles early exit
    #[arg(long, default_value_t = 0.1)]
    pub uniform_significance: f64,

    /// Non-maximum suppression radius for the classic variant
    #[arg(long, default_value_t = 8)]
    pub suppression_radius: u32,

    /// Spread votes by (width + height) / 4 instead of max(width, height) / 2
    #[arg(long)]
    pub mean_displacement: bool,

    /// Skip writing the rendered row-band masks
    #[arg(long)]
    pub no_masks: bool,

    /// Show per-stage detection details
    #[arg(long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantArg {
    RegionWeighted,
    Classic,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::RegionWeighted => Variant::RegionWeighted,
            VariantArg::Classic => Variant::Classic,
        }
    }
}

impl Cli {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            variant: self.variant.into(),
            step_theta: self.step_theta,
            step_rho: self.step_rho,
            threshold: self.threshold,
            angle_error: self.angle_error,
            clustering_tol: self.clustering_tol,
            uniform_significance: self.uniform_significance,
            suppression_radius: self.suppression_radius,
            displacement: if self.mean_displacement {
                mean_displacement
            } else {
                max_displacement
            },
        }
    }
}

fn parse_clustering_tol(s: &str) -> Result<ClusteringTol, String> {
    if s.eq_ignore_ascii_case("crop") {
        return Ok(ClusteringTol::CropSize);
    }
    let tol: f64 = s
        .parse()
        .map_err(|_| format!("expected a number or \"crop\", got '{s}'"))?;
    if tol < 0.0 {
        return Err("clustering tolerance must be non-negative".to_string());
    }
    Ok(ClusteringTol::Fixed(tol))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clustering_tol() {
        assert_eq!(parse_clustering_tol("2.5"), Ok(ClusteringTol::Fixed(2.5)));
        assert_eq!(parse_clustering_tol("crop"), Ok(ClusteringTol::CropSize));
        assert_eq!(parse_clustering_tol("CROP"), Ok(ClusteringTol::CropSize));
        assert!(parse_clustering_tol("-1").is_err());
        assert!(parse_clustering_tol("rows").is_err());
    }

    #[test]
    fn test_defaults_match_detector_defaults() {
        let cli = Cli::parse_from(["crop-rows", "mask.png"]);
        let config = cli.detector_config();
        assert_eq!(config.step_theta, 1.0);
        assert_eq!(config.threshold, 10.0);
        assert_eq!(config.angle_error, 3);
        assert_eq!(config.clustering_tol, ClusteringTol::Fixed(2.0));
        assert_eq!(config.variant, Variant::RegionWeighted);
    }
}

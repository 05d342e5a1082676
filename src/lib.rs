mod classic;

pub mod cli;
pub mod cluster;
pub mod detector;
pub mod error;
pub mod filter;
pub mod hough;
pub mod mask;
pub mod regions;
pub mod render;
pub mod segment;

pub use cli::Cli;
pub use detector::{
    ClusteringTol, CropRowDetector, DetectOptions, Detection, DetectorConfig, Line, Variant,
};
pub use error::DetectError;
pub use hough::{max_displacement, mean_displacement, DisplacementFn};
pub use mask::BinaryMask;
pub use regions::{extract_regions, Region, RegionExtraction};
pub use segment::{Segmenter, ThresholdSegmenter};

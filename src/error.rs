use thiserror::Error;

/// Errors produced by the detector and its collaborators.
///
/// Expected terminal states (empty mask, no votes above threshold, uniform
/// angle spread) are not errors; they yield an empty [`crate::Detection`].
#[derive(Debug, Error)]
pub enum DetectError {
    /// The mask is not a single-channel 2D image.
    #[error("mask must be single-channel, got {channels} channels")]
    ShapeMismatch { channels: u8 },

    /// Invalid configuration, reported at detector construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The external vegetation segmenter failed; propagated unchanged.
    #[error("segmentation failed")]
    Segmentation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, DetectError>;

use std::convert::Infallible;

use image::{DynamicImage, GrayImage, Luma};

/// Contract for the external vegetation segmenter.
///
/// The returned mask must have the same spatial dimensions as the input;
/// any positive pixel is foreground. Implementations may run on accelerated
/// hardware; errors propagate to the detection caller unchanged.
pub trait Segmenter {
    type Error: std::error::Error + Send + Sync + 'static;

    fn segment(&self, image: &DynamicImage) -> Result<GrayImage, Self::Error>;
}

/// Trivial luminance-threshold segmenter, mainly for tests and quick CLI
/// runs on images that are already near-binary.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdSegmenter {
    pub threshold: u8,
}

impl Default for ThresholdSegmenter {
    fn default() -> Self {
        Self { threshold: 127 }
    }
}

impl Segmenter for ThresholdSegmenter {
    type Error = Infallible;

    fn segment(&self, image: &DynamicImage) -> Result<GrayImage, Self::Error> {
        let gray = image.to_luma8();
        let mut mask = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            if pixel[0] > self.threshold {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        Ok(mask)
    }
}

use image::{DynamicImage, GrayImage};

use crate::error::{DetectError, Result};

/// Binary vegetation mask: any pixel above zero is foreground.
///
/// Produced by the external segmenter or loaded from disk. Immutable input
/// to one detection call.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Validate a decoded image as a mask.
    ///
    /// Accepts single-channel images only; a multi-channel image here is a
    /// contract violation by the caller, not something to silently coerce.
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageLuma8(buf) => Ok(Self::new(buf)),
            DynamicImage::ImageLuma16(buf) => {
                let converted = DynamicImage::ImageLuma16(buf).to_luma8();
                Ok(Self::new(converted))
            }
            other => Err(DetectError::ShapeMismatch {
                channels: other.color().channel_count(),
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Diagonal length of the mask in pixels.
    pub fn diagonal(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        (w * w + h * h).sqrt()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] > 0
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    #[test]
    fn test_luma_accepted() {
        let img = GrayImage::from_pixel(4, 3, Luma([255]));
        let mask = BinaryMask::from_image(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!((mask.width(), mask.height()), (4, 3));
        assert!(mask.is_foreground(0, 0));
    }

    #[test]
    fn test_rgb_rejected() {
        let img = RgbImage::new(4, 4);
        let err = BinaryMask::from_image(DynamicImage::ImageRgb8(img)).unwrap_err();
        assert!(matches!(err, DetectError::ShapeMismatch { channels: 3 }));
    }

    #[test]
    fn test_diagonal() {
        let mask = BinaryMask::new(GrayImage::new(3, 4));
        assert!((mask.diagonal() - 5.0).abs() < 1e-9);
    }
}

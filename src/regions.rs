use image::{ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;

use crate::mask::BinaryMask;

/// Map of component labels, parallel to the mask (0 = background).
pub type LabelMap = ImageBuffer<Luma<u32>, Vec<u32>>;

/// One connected foreground component, summarized by bounding box,
/// centroid and cardinality.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Bounding box, inclusive corners, within mask bounds.
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    /// Box midpoint, rounded to whole pixels.
    pub centroid: (f64, f64),
    pub pixel_count: usize,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }
}

/// Result of connected-component labeling, ordered by label.
#[derive(Debug, Clone)]
pub struct RegionExtraction {
    pub regions: Vec<Region>,
    pub label_map: LabelMap,
}

impl RegionExtraction {
    /// Average of (width + height) / 2 across all regions, used as an
    /// adaptive clustering tolerance. `None` when the mask has no foreground.
    pub fn mean_crop_size(&self) -> Option<f64> {
        if self.regions.is_empty() {
            return None;
        }
        let total: f64 = self
            .regions
            .iter()
            .map(|r| (r.width() + r.height()) as f64 / 2.0)
            .sum();
        Some(total / self.regions.len() as f64)
    }
}

/// Label 8-connected foreground components and summarize each one.
///
/// An all-background mask yields an empty region list; that is a valid
/// terminal state for the pipeline, not an error.
pub fn extract_regions(mask: &BinaryMask) -> RegionExtraction {
    let label_map = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));

    let mut boxes: Vec<(u32, u32, u32, u32, usize)> = Vec::new();
    for (x, y, pixel) in label_map.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        if boxes.len() < label {
            boxes.resize(label, (u32::MAX, u32::MAX, 0, 0, 0));
        }
        let entry = &mut boxes[label - 1];
        entry.0 = entry.0.min(x);
        entry.1 = entry.1.min(y);
        entry.2 = entry.2.max(x);
        entry.3 = entry.3.max(y);
        entry.4 += 1;
    }

    let regions: Vec<Region> = boxes
        .into_iter()
        .filter(|&(_, _, _, _, count)| count > 0)
        .map(|(x0, y0, x1, y1, pixel_count)| {
            let cx = ((x0 + x1) as f64 / 2.0).round();
            let cy = ((y0 + y1) as f64 / 2.0).round();
            Region {
                x0,
                y0,
                x1,
                y1,
                centroid: (cx, cy),
                pixel_count,
            }
        })
        .collect();

    debug!("labeled {} foreground regions", regions.len());
    RegionExtraction { regions, label_map }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn mask_from_points(width: u32, height: u32, points: &[(u32, u32)]) -> BinaryMask {
        let mut img = GrayImage::new(width, height);
        for &(x, y) in points {
            img.put_pixel(x, y, Luma([255]));
        }
        BinaryMask::new(img)
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        let mask = BinaryMask::new(GrayImage::new(8, 8));
        let extraction = extract_regions(&mask);
        assert!(extraction.regions.is_empty());
        assert_eq!(extraction.mean_crop_size(), None);
    }

    #[test]
    fn test_single_block() {
        let points: Vec<(u32, u32)> = (2..5).flat_map(|y| (3..6).map(move |x| (x, y))).collect();
        let mask = mask_from_points(10, 10, &points);
        let extraction = extract_regions(&mask);
        assert_eq!(extraction.regions.len(), 1);
        let region = &extraction.regions[0];
        assert_eq!((region.x0, region.y0, region.x1, region.y1), (3, 2, 5, 4));
        assert_eq!(region.centroid, (4.0, 3.0));
        assert_eq!(region.pixel_count, 9);
        assert_eq!(region.width(), 3);
        assert_eq!(region.height(), 3);
        assert_eq!(extraction.mean_crop_size(), Some(3.0));
    }

    #[test]
    fn test_diagonal_pixels_are_one_component() {
        // 8-connectivity joins diagonal neighbours.
        let mask = mask_from_points(6, 6, &[(1, 1), (2, 2), (3, 3)]);
        let extraction = extract_regions(&mask);
        assert_eq!(extraction.regions.len(), 1);
        assert_eq!(extraction.regions[0].pixel_count, 3);
    }

    #[test]
    fn test_two_separate_blocks() {
        let mask = mask_from_points(12, 12, &[(1, 1), (1, 2), (9, 9), (10, 9)]);
        let extraction = extract_regions(&mask);
        assert_eq!(extraction.regions.len(), 2);
        // (1+2)/2 and (2+1)/2
        assert_eq!(extraction.mean_crop_size(), Some(1.5));
    }
}

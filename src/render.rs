use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::detector::Line;

/// Endpoints of a polar line extended across the image, in pixel
/// coordinates with rho measured from the image centre.
fn line_endpoints(theta_deg: f64, rho: f64, width: u32, height: u32) -> (Point<i32>, Point<i32>) {
    let theta = theta_deg.to_radians();
    let (a, b) = (theta.cos(), theta.sin());
    let x0 = a * rho + width as f64 / 2.0;
    let y0 = b * rho + height as f64 / 2.0;
    let span = width as f64;
    let p1 = Point::new((x0 - span * b) as i32, (y0 + span * a) as i32);
    let p2 = Point::new((x0 + span * b) as i32, (y0 - span * a) as i32);
    (p1, p2)
}

/// Rasterize detected rows as filled bands.
///
/// Each line becomes the quad between its two parallels at rho +/- the band
/// half-width, which is typically the detection's mean crop size.
pub fn draw_row_bands(width: u32, height: u32, lines: &[Line], half_width: f64) -> GrayImage {
    let mut canvas = GrayImage::new(width, height);
    let half_width = half_width.max(1.0);
    for line in lines {
        let (a1, a2) = line_endpoints(line.theta_deg, line.rho + half_width, width, height);
        let (b1, b2) = line_endpoints(line.theta_deg, line.rho - half_width, width, height);
        draw_polygon_mut(&mut canvas, &[a1, a2, b2, b1], Luma([255u8]));
    }
    canvas
}

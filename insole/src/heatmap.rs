// Heatmap rendering module
// Turns a decoded pressure grid into a color image the arch classifier can read

use image::{Rgb, RgbImage};
use insole_common::{PressureMatrix, MAX_PRESSURE};

/// Largest accepted `scale`; 64 turns the 60×60 grid into a 3840×3840 image
pub const MAX_SCALE: u32 = 64;

/// Render the pressure grid with the "jet" colormap, one `scale`×`scale` block per cell
/// The color range is fixed at 0..=4095 so images from different fetches are comparable
pub fn render_heatmap(matrix: &PressureMatrix, scale: u32) -> RgbImage {
    let scale = scale.clamp(1, MAX_SCALE);
    let width = matrix.cols() as u32 * scale;
    let height = matrix.rows() as u32 * scale;

    let cells = matrix.as_array();
    RgbImage::from_fn(width, height, |x, y| {
        let value = cells[[(y / scale) as usize, (x / scale) as usize]];
        jet(f64::from(value) / f64::from(MAX_PRESSURE))
    })
}

/// Jet colormap: dark blue at 0, through cyan, yellow, to dark red at 1
pub fn jet(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |center: f64| {
        let c = (1.5 - (4.0 * t - center).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

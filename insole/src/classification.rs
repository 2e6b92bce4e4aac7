// Arch classification module
// Estimates arch height from how much of the footprint is covered by high-pressure colors

use anyhow::{Context, Result};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    contours::{find_contours, BorderType},
    contrast::{threshold, ThresholdType},
    drawing::draw_hollow_rect_mut,
    filter::median_filter,
    morphology::{grayscale_open, Mask},
    point::Point,
    rect::Rect,
};
use insole_common::{ArchThresholds, ArchType};
use tracing::{debug, warn};

/// Gray level above which a pixel belongs to the foot silhouette
const SILHOUETTE_THRESHOLD: u8 = 30;

/// Median filter radius (5×5 window)
const MEDIAN_RADIUS: u32 = 2;

/// Number of footprints considered (left and right foot)
const MAX_FOOTPRINTS: usize = 2;

/// Inclusive HSV band using 8-bit hue (0..180) like OpenCV
#[derive(Debug, Clone, Copy)]
struct HsvBand {
    hue_min: u8,
    hue_max: u8,
    saturation_min: u8,
    value_min: u8,
}

impl HsvBand {
    const fn new(hue_min: u8, hue_max: u8) -> Self {
        Self {
            hue_min,
            hue_max,
            saturation_min: 100,
            value_min: 100,
        }
    }

    fn contains(&self, (h, s, v): (u8, u8, u8)) -> bool {
        (self.hue_min..=self.hue_max).contains(&h)
            && s >= self.saturation_min
            && v >= self.value_min
    }
}

/// Red wraps around hue 0, so it takes two bands
const RED_BANDS: [HsvBand; 2] = [HsvBand::new(0, 10), HsvBand::new(160, 179)];
const YELLOW_BAND: HsvBand = HsvBand::new(20, 35);

/// Axis-aligned bounding box of one footprint, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootprintBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FootprintBox {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Result of analysing one pressure image
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub arch: ArchType,
    /// (red + yellow) / footprint area, in percent
    pub ratio: f64,
    pub red_pixels: u32,
    pub yellow_pixels: u32,
    /// Sum of the footprint bounding-box areas
    pub footprint_area: u32,
    pub footprints: Vec<FootprintBox>,
}

/// Binary masks of the high-pressure palette colors
pub struct PressureMasks {
    pub red: GrayImage,
    pub yellow: GrayImage,
}

impl PressureMasks {
    pub fn from_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut red = GrayImage::new(width, height);
        let mut yellow = GrayImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let hsv = rgb_to_hsv(pixel);
            if RED_BANDS.iter().any(|band| band.contains(hsv)) {
                red.put_pixel(x, y, Luma([255]));
            }
            if YELLOW_BAND.contains(hsv) {
                yellow.put_pixel(x, y, Luma([255]));
            }
        }

        Self { red, yellow }
    }
}

pub struct ArchClassifier {
    thresholds: ArchThresholds,
}

impl ArchClassifier {
    pub fn new(thresholds: ArchThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify a color pressure image as Flat, High or Normal
    /// Always produces a label; an image without footprints has ratio 0
    pub fn analyze(&self, image: &RgbImage) -> Classification {
        let masks = PressureMasks::from_image(image);
        let red_pixels = count_nonzero(&masks.red);
        let yellow_pixels = count_nonzero(&masks.yellow);

        let footprints = find_footprints(image);
        let footprint_area: u32 = footprints.iter().map(FootprintBox::area).sum();

        let ratio = if footprint_area == 0 {
            warn!("No footprint found in image; pressure ratio defaults to 0");
            0.0
        } else {
            f64::from(red_pixels + yellow_pixels) / f64::from(footprint_area) * 100.0
        };

        let arch = self.thresholds.classify(ratio);

        debug!(
            red_pixels,
            yellow_pixels,
            footprint_area,
            footprints = footprints.len(),
            ratio,
            %arch,
            "arch classified"
        );

        Classification {
            arch,
            ratio,
            red_pixels,
            yellow_pixels,
            footprint_area,
            footprints,
        }
    }
}

/// Locate up to two footprints and return their bounding boxes, largest first
pub fn find_footprints(image: &RgbImage) -> Vec<FootprintBox> {
    let silhouette = pad_border(&silhouette(image));

    let mut outer: Vec<(f64, FootprintBox)> = find_contours::<i32>(&silhouette)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .filter_map(|contour| {
            // Back to image coordinates
            let points: Vec<Point<i32>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            let bbox = bounding_box(&points)?;
            Some((contour_area(&points), bbox))
        })
        .collect();

    debug!("Found {} external contours", outer.len());

    outer.sort_by(|a, b| b.0.total_cmp(&a.0));
    outer.truncate(MAX_FOOTPRINTS);
    outer.into_iter().map(|(_, bbox)| bbox).collect()
}

/// Grayscale, despeckle and binarize the image into a foot silhouette
fn silhouette(image: &RgbImage) -> GrayImage {
    let gray = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma_bt601(image.get_pixel(x, y))])
    });

    let smoothed = median_filter(&gray, MEDIAN_RADIUS, MEDIAN_RADIUS);
    let opened = grayscale_open(&smoothed, &ellipse_mask());

    threshold(&opened, SILHOUETTE_THRESHOLD, ThresholdType::Binary)
}

/// Surround the silhouette with a 1-pixel background frame
///
/// Border following only reports a blob as an outer border when background
/// separates it from the image edge, so footprints touching the edge need the frame.
fn pad_border(silhouette: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(silhouette.width() + 2, silhouette.height() + 2);
    imageops::replace(&mut padded, silhouette, 1, 1);
    padded
}

/// 5×5 elliptical structuring element
///
/// ```text
/// . . # . .
/// # # # # #
/// # # # # #
/// # # # # #
/// . . # . .
/// ```
fn ellipse_mask() -> Mask {
    let shape = GrayImage::from_fn(5, 5, |x, y| {
        if (y == 0 || y == 4) && x != 2 {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    Mask::from_image(&shape, 2, 2)
}

/// BT.601 luma with integer rounding
fn luma_bt601(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(u32::from);
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}

/// RGB to HSV with hue halved into 0..180 and saturation / value in 0..=255
fn rgb_to_hsv(pixel: &Rgb<u8>) -> (u8, u8, u8) {
    let [r, g, b] = pixel.0.map(f64::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta * 255.0 / max };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 { hue_degrees + 360.0 } else { hue_degrees };

    let mut hue = (hue_degrees / 2.0).round() as u32;
    if hue >= 180 {
        hue -= 180;
    }

    (hue as u8, saturation.round() as u8, max as u8)
}

fn count_nonzero(mask: &GrayImage) -> u32 {
    mask.pixels().filter(|p| p[0] > 0).count() as u32
}

/// Bounding box with inclusive pixel extents
fn bounding_box(points: &[Point<i32>]) -> Option<FootprintBox> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;

    Some(FootprintBox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

/// Calculate the area of a contour using the shoelace formula
fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += f64::from(points[i].x) * f64::from(points[j].y);
        area -= f64::from(points[j].x) * f64::from(points[i].y);
    }

    (area / 2.0).abs()
}

/// Save the color masks and the detected footprint boxes next to `prefix`
pub fn save_debug_images(
    image: &RgbImage,
    classification: &Classification,
    prefix: &str,
) -> Result<Vec<String>> {
    let masks = PressureMasks::from_image(image);

    let red_path = format!("{}_red_mask.png", prefix);
    masks.red.save(&red_path).with_context(|| format!("Failed to write {}", red_path))?;

    let yellow_path = format!("{}_yellow_mask.png", prefix);
    masks.yellow.save(&yellow_path).with_context(|| format!("Failed to write {}", yellow_path))?;

    let mut overlay = image.clone();
    let color = Rgb([0, 255, 0]);
    for footprint in &classification.footprints {
        let rect = Rect::at(footprint.x as i32, footprint.y as i32)
            .of_size(footprint.width, footprint.height);
        draw_hollow_rect_mut(&mut overlay, rect, color);
    }
    let footprints_path = format!("{}_footprints.png", prefix);
    overlay.save(&footprints_path).with_context(|| format!("Failed to write {}", footprints_path))?;

    Ok(vec![red_path, yellow_path, footprints_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const LOW_PRESSURE: Rgb<u8> = Rgb([0, 128, 255]);

    fn fill(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                image.put_pixel(x, y, color);
            }
        }
    }

    fn classifier() -> ArchClassifier {
        ArchClassifier::new(ArchThresholds::default())
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 0])), (0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([255, 255, 0])), (30, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 255])), (120, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 10])), (179, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 0])), (0, 0, 0));
    }

    #[test]
    fn test_color_masks() {
        let mut image = RgbImage::from_pixel(6, 1, BACKGROUND);
        image.put_pixel(0, 0, Rgb([255, 0, 0])); // red
        image.put_pixel(1, 0, Rgb([255, 0, 10])); // red across the hue wrap
        image.put_pixel(2, 0, Rgb([255, 255, 0])); // yellow
        image.put_pixel(3, 0, Rgb([255, 128, 0])); // orange, neither
        image.put_pixel(4, 0, Rgb([100, 0, 0])); // dark red at the value floor
        image.put_pixel(5, 0, Rgb([90, 0, 0])); // too dark

        let masks = PressureMasks::from_image(&image);
        let red: Vec<u8> = masks.red.pixels().map(|p| p[0]).collect();
        let yellow: Vec<u8> = masks.yellow.pixels().map(|p| p[0]).collect();

        assert_eq!(red, vec![255, 255, 0, 0, 255, 0]);
        assert_eq!(yellow, vec![0, 0, 255, 0, 0, 0]);
    }

    #[test]
    fn test_black_image_is_high() {
        let image = RgbImage::from_pixel(64, 64, BACKGROUND);
        let result = classifier().analyze(&image);

        assert!(result.footprints.is_empty());
        assert_eq!(result.footprint_area, 0);
        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.arch, ArchType::High);
    }

    #[test]
    fn test_quarter_red_footprint_is_normal() {
        let mut image = RgbImage::from_pixel(120, 100, BACKGROUND);
        fill(&mut image, 20, 20, 50, 40, LOW_PRESSURE);
        fill(&mut image, 20, 20, 50, 10, RED);

        let result = classifier().analyze(&image);

        assert_eq!(
            result.footprints,
            vec![FootprintBox { x: 20, y: 20, width: 50, height: 40 }]
        );
        assert_eq!(result.red_pixels, 500);
        assert_eq!(result.yellow_pixels, 0);
        assert!((result.ratio - 25.0).abs() < 1e-9);
        assert_eq!(result.arch, ArchType::Normal);
    }

    #[test]
    fn test_sparse_pressure_is_high() {
        let mut image = RgbImage::from_pixel(120, 100, BACKGROUND);
        fill(&mut image, 20, 20, 50, 40, LOW_PRESSURE);
        fill(&mut image, 20, 20, 50, 4, RED);

        let result = classifier().analyze(&image);
        assert!((result.ratio - 10.0).abs() < 1e-9);
        assert_eq!(result.arch, ArchType::High);
    }

    #[test]
    fn test_two_largest_footprints_are_kept() {
        let mut image = RgbImage::from_pixel(200, 100, BACKGROUND);
        fill(&mut image, 10, 10, 30, 30, RED);
        fill(&mut image, 100, 10, 30, 30, RED);
        // Small blob that is large enough to survive the opening
        fill(&mut image, 170, 70, 8, 8, RED);

        let result = classifier().analyze(&image);

        assert_eq!(result.footprints.len(), 2);
        assert_eq!(result.footprint_area, 1800);
        assert!(result.footprints.iter().all(|f| f.width == 30 && f.height == 30));
        assert_eq!(result.red_pixels, 1800 + 64);
        assert_eq!(result.arch, ArchType::Flat);
    }

    #[test]
    fn test_footprint_touching_each_edge() {
        // (x, y) of a 30×30 footprint flush against one edge of a 60×60 image
        for (x, y) in [(0, 15), (30, 15), (15, 0), (15, 30)] {
            let mut image = RgbImage::from_pixel(60, 60, BACKGROUND);
            fill(&mut image, x, y, 30, 30, RED);

            let result = classifier().analyze(&image);

            assert_eq!(
                result.footprints,
                vec![FootprintBox { x, y, width: 30, height: 30 }],
                "footprint at ({}, {})",
                x,
                y
            );
            assert!((result.ratio - 100.0).abs() < 1e-9);
            assert_eq!(result.arch, ArchType::Flat);
        }
    }

    #[test]
    fn test_edge_footprint_matches_centered_footprint() {
        let mut centered = RgbImage::from_pixel(60, 60, BACKGROUND);
        fill(&mut centered, 10, 10, 30, 30, RED);
        let mut left = RgbImage::from_pixel(60, 60, BACKGROUND);
        fill(&mut left, 0, 10, 30, 30, RED);

        let centered = classifier().analyze(&centered);
        let left = classifier().analyze(&left);

        assert_eq!(left.footprint_area, centered.footprint_area);
        assert_eq!(left.ratio, centered.ratio);
        assert_eq!(left.arch, centered.arch);
    }

    #[test]
    fn test_fully_covered_image_is_one_footprint() {
        let image = RgbImage::from_pixel(60, 60, RED);
        let result = classifier().analyze(&image);

        assert_eq!(
            result.footprints,
            vec![FootprintBox { x: 0, y: 0, width: 60, height: 60 }]
        );
        assert_eq!(result.footprint_area, 3600);
        assert!((result.ratio - 100.0).abs() < 1e-9);
        assert_eq!(result.arch, ArchType::Flat);
    }

    #[test]
    fn test_pad_border() {
        let silhouette = GrayImage::from_pixel(3, 2, Luma([255]));
        let padded = pad_border(&silhouette);

        assert_eq!(padded.dimensions(), (5, 4));
        assert_eq!(padded.get_pixel(0, 0)[0], 0);
        assert_eq!(padded.get_pixel(4, 3)[0], 0);
        assert_eq!(padded.get_pixel(1, 1)[0], 255);
        assert_eq!(padded.get_pixel(3, 2)[0], 255);
    }

    #[test]
    fn test_speckle_is_not_a_footprint() {
        let mut image = RgbImage::from_pixel(50, 50, BACKGROUND);
        image.put_pixel(25, 25, RED);
        image.put_pixel(10, 40, RED);

        let result = classifier().analyze(&image);
        assert!(result.footprints.is_empty());
        assert_eq!(result.ratio, 0.0);
    }

    #[test]
    fn test_contour_area_and_bbox() {
        let square = vec![
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 4),
            Point::new(0, 4),
        ];
        assert_eq!(contour_area(&square), 16.0);
        assert_eq!(
            bounding_box(&square),
            Some(FootprintBox { x: 0, y: 0, width: 5, height: 5 })
        );
        assert_eq!(bounding_box(&[]), None);
    }

    #[test]
    fn test_save_debug_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = RgbImage::from_pixel(80, 80, BACKGROUND);
        fill(&mut image, 10, 10, 40, 40, RED);

        let result = classifier().analyze(&image);
        let prefix = dir.path().join("case").to_string_lossy().into_owned();
        let written = save_debug_images(&image, &result, &prefix).unwrap();

        assert_eq!(written.len(), 3);
        for path in &written {
            assert!(std::path::Path::new(path).exists(), "missing {}", path);
        }
        let overlay = image::open(&written[2]).unwrap().to_rgb8();
        assert_eq!(*overlay.get_pixel(10, 10), Rgb([0, 255, 0]));
    }
}

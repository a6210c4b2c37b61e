//! Plate localization from edges and contours.
//!
//! The pipeline is: grayscale, bilateral smoothing, canny, contour tracing,
//! then the first contour among the largest ones that simplifies to a
//! quadrilateral is taken as the plate. No learned detector is involved.

use image::{ DynamicImage, GrayImage, Luma };
use imageproc::contours::{ self, Contour };
use imageproc::drawing::draw_polygon_mut;
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;
use imageproc::geometry::{ approximate_polygon_dp, arc_length };
use imageproc::point::Point;
use log::debug;
use serde::{ Deserialize, Serialize };

use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// bilateral window size in pixels
    pub bilateral_diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// how many of the largest contours are tried
    pub max_candidates: usize,
    /// polygon approximation tolerance as a fraction of the perimeter
    pub epsilon_ratio: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 11,
            sigma_color: 17.0,
            sigma_space: 17.0,
            canny_low: 30.0,
            canny_high: 200.0,
            max_candidates: 10,
            epsilon_ratio: 0.018,
        }
    }
}

/// Inclusive pixel bounds of the located plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlateRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PlateRegion {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn crop(&self, img: &DynamicImage) -> DynamicImage {
        img.crop_imm(self.left, self.top, self.width(), self.height())
    }
}

/// A traced contour with its enclosed area.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub points: Vec<Point<i32>>,
    pub area: f64,
}

impl From<Contour<i32>> for Candidate {
    fn from(contour: Contour<i32>) -> Self {
        let area = polygon_area(&contour.points);
        Self { points: contour.points, area }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlateLocalizer {
    config: LocalizerConfig,
}

impl PlateLocalizer {

    pub fn new(config: LocalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Find the most plate-like quadrilateral, `None` when the largest
    /// contours contain no four-sided shape.
    pub fn locate(&self, img: &DynamicImage) -> Option<PlateRegion> {
        if img.width() == 0 || img.height() == 0 {
            return None;
        }
        let edges = self.edge_map(img);
        self.select_region(&edges)
    }

    /// Smoothed canny edges of the grayscale image.
    pub fn edge_map(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        let config = &self.config;
        let smoothed = bilateral_filter(&gray, config.bilateral_diameter, config.sigma_color, config.sigma_space);
        canny(&smoothed, config.canny_low, config.canny_high)
    }

    /// Candidate selection over a binary edge map.
    pub fn select_region(&self, edges: &GrayImage) -> Option<PlateRegion> {
        let candidates = self.ranked_candidates(edges);
        debug!("trying {} contour candidates", candidates.len());

        for (rank, candidate) in candidates.iter().enumerate() {
            let quad = match self.approximate(&candidate.points) {
                Some(poly) if poly.len() == 4 => poly,
                _ => continue,
            };
            if let Some(region) = mask_bounds(&quad, edges.width(), edges.height()) {
                debug!("candidate {} (area {:.1}) is a quadrilateral: {:?}", rank, candidate.area, region);
                return Some(region);
            }
        }
        None
    }

    /// All contours ordered by area, largest first, cut to `max_candidates`.
    /// The sort is stable so equal areas keep tracing order.
    pub fn ranked_candidates(&self, edges: &GrayImage) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = contours::find_contours::<i32>(edges)
            .into_iter()
            .map(Candidate::from)
            .collect();
        candidates.sort_by(|a, b| b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal));
        candidates.truncate(self.config.max_candidates);
        candidates
    }

    fn approximate(&self, points: &[Point<i32>]) -> Option<Vec<Point<i32>>> {
        if points.len() < 3 {
            return None;
        }
        let epsilon = self.config.epsilon_ratio * arc_length(points, true);
        if epsilon <= 0.0 {
            return None;
        }
        Some(approximate_closed(points, epsilon))
    }
}

/// Douglas-Peucker over a closed curve.
///
/// The curve is cut at two mutually distant points and each half is simplified
/// as an open curve, so the arbitrary tracing start never survives as a vertex.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.is_empty() {
        return Vec::new();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[0]];
    }
    let (i, j) = if a < b { (a, b) } else { (b, a) };

    let first = approximate_polygon_dp(&points[i..=j], epsilon, false);
    let mut wrapped: Vec<Point<i32>> = points[j..].to_vec();
    wrapped.extend_from_slice(&points[..=i]);
    let second = approximate_polygon_dp(&wrapped, epsilon, false);

    let mut poly: Vec<Point<i32>> = Vec::with_capacity(first.len() + second.len());
    poly.extend_from_slice(&first[..first.len() - 1]);
    poly.extend_from_slice(&second[..second.len() - 1]);
    poly.dedup();
    // thin traces can come back to their start pixel
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    poly
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = -1i64;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        let dist = dx * dx + dy * dy;
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points.iter().zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

/// Fill `poly` into a mask and return the min/max row and column of the
/// filled pixels. Rotated quads therefore include some background.
fn mask_bounds(poly: &[Point<i32>], width: u32, height: u32) -> Option<PlateRegion> {
    let mut mask = GrayImage::new(width, height);
    draw_polygon_mut(&mut mask, poly, Luma([255u8]));

    let mut region: Option<PlateRegion> = None;
    for (x, y, p) in mask.enumerate_pixels() {
        if p[0] != 255 {
            continue;
        }
        region = Some(match region {
            None => PlateRegion { left: x, top: y, right: x, bottom: y },
            Some(r) => PlateRegion {
                left: r.left.min(x),
                top: r.top.min(y),
                right: r.right.max(x),
                bottom: r.bottom.max(y),
            },
        });
    }
    region
}

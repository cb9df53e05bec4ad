use geo_types::{LineString, MultiPolygon, Polygon};
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use super::ShapeRoi;

/// A raster-backed legacy shape: non-zero pixels of `mask` are inside.
#[derive(Debug, Clone)]
pub struct ImageRoi {
    x: i32,
    y: i32,
    mask: GrayImage,
}

impl ImageRoi {
    pub fn new(x: i32, y: i32, mask: GrayImage) -> Self {
        Self { x, y, mask }
    }

    pub fn x_base(&self) -> i32 {
        self.x
    }

    pub fn y_base(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn set_location(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (Some(dx), Some(dy)) = (x.checked_sub(self.x), y.checked_sub(self.y)) else {
            return false;
        };
        let (Ok(px), Ok(py)) = (u32::try_from(dx), u32::try_from(dy)) else {
            return false;
        };
        px < self.mask.width() && py < self.mask.height() && self.mask.get_pixel(px, py).0[0] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    /// Trace the foreground into polygons through pixel centres.
    ///
    /// Outer borders become exteriors and hole borders attach to their
    /// parent; features thinner than two pixels collapse and are dropped.
    pub fn to_shape(&self) -> ShapeRoi {
        let contours = find_contours::<i32>(&self.mask);
        let (ox, oy) = (self.x as f64 + 0.5, self.y as f64 + 0.5);

        let mut rings: Vec<Option<(LineString<f64>, Vec<LineString<f64>>)>> =
            vec![None; contours.len()];
        let mut holes = Vec::new();

        for (index, contour) in contours.iter().enumerate() {
            if contour.points.len() < 3 {
                continue;
            }
            let ring: LineString<f64> = contour
                .points
                .iter()
                .map(|p| (p.x as f64 + ox, p.y as f64 + oy))
                .collect::<Vec<_>>()
                .into();
            match contour.border_type {
                BorderType::Outer => rings[index] = Some((ring, Vec::new())),
                BorderType::Hole => holes.push((contour.parent, ring)),
            }
        }

        for (parent, ring) in holes {
            if let Some(Some((_, interiors))) = parent.and_then(|p| rings.get_mut(p)) {
                interiors.push(ring);
            }
        }

        let polygons = rings
            .into_iter()
            .flatten()
            .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
            .collect();
        ShapeRoi::new(MultiPolygon::new(polygons))
    }
}

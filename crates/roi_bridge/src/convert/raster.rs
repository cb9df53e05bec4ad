//! Last-resort conversion of any bounded 2-D mask into an image roi.

use image::{GrayImage, Luma};
use tracing::debug;

use super::{ConvertService, ConverterDescriptor, Value};
use crate::{
    error::{BridgeError, Result},
    geometry::RealInterval,
    legacy::{ImageRoi, Roi, RoiRef},
    mask::MaskRef,
    traits::Rasterizer,
    types::{TypeTag, priority},
};

/// Largest raster the fallback will allocate, in pixels.
pub const MAX_RASTER_PIXELS: u64 = 1 << 26;

const INSIDE: Luma<u8> = Luma([255]);
const OUTSIDE: Luma<u8> = Luma([0]);

/// The integer pixel window a mask is sampled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RasterRegion {
    /// `[floor(min), floor(max)]` on both axes, both ends included.
    pub fn covering(bounds: &RealInterval) -> Result<Self> {
        if bounds.num_dimensions() != 2 {
            return Err(BridgeError::illegal(format!(
                "only 2-D masks can be rasterized, got {} dimensions",
                bounds.num_dimensions()
            )));
        }
        if !bounds.is_bounded() {
            return Err(BridgeError::illegal("cannot rasterize an unbounded mask"));
        }
        let (min, max) = (bounds.min(), bounds.max());
        let axis = |d: usize| -> Result<(i32, u32)> {
            let (lo, hi) = (min[d].floor(), max[d].floor());
            let span = hi - lo + 1.0;
            if lo < i32::MIN as f64 || hi > i32::MAX as f64 || span > MAX_RASTER_PIXELS as f64 {
                return Err(BridgeError::illegal(format!(
                    "raster axis {d} spans [{lo}, {hi}], outside the pixel grid"
                )));
            }
            Ok((lo as i32, span as u32))
        };
        let (x, width) = axis(0)?;
        let (y, height) = axis(1)?;
        let region = Self {
            x,
            y,
            width,
            height,
        };
        if region.pixels() > MAX_RASTER_PIXELS {
            return Err(BridgeError::illegal(format!(
                "raster of {width}x{height} exceeds {MAX_RASTER_PIXELS} pixels"
            )));
        }
        Ok(region)
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Samples `test` at every integer grid point of the region.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateRasterizer;

impl Rasterizer for PredicateRasterizer {
    fn rasterize(&self, mask: &MaskRef, region: &RasterRegion) -> Result<GrayImage> {
        let (x0, y0) = (region.x as f64, region.y as f64);
        Ok(GrayImage::from_fn(region.width, region.height, |i, j| {
            if mask.test(&[x0 + i as f64, y0 + j as f64]) {
                INSIDE
            } else {
                OUTSIDE
            }
        }))
    }
}

/// Turns a mask into an [`ImageRoi`] through an injected rasterizer.
pub struct RasterFallbackConverter<'a> {
    rasterizer: &'a dyn Rasterizer,
}

impl<'a> RasterFallbackConverter<'a> {
    pub fn new(rasterizer: &'a dyn Rasterizer) -> Self {
        Self { rasterizer }
    }

    /// Whether `mask` has a finite 2-D extent small enough to rasterize.
    pub fn supports(mask: &MaskRef) -> bool {
        RasterRegion::covering(&mask.bounds()).is_ok()
    }

    pub fn convert(&self, mask: &MaskRef) -> Result<RoiRef> {
        let region = RasterRegion::covering(&mask.bounds())?;
        let raster = self.rasterizer.rasterize(mask, &region)?;
        if raster.dimensions() != (region.width, region.height) {
            return Err(BridgeError::illegal(format!(
                "rasterizer returned {:?} for a {}x{} region",
                raster.dimensions(),
                region.width,
                region.height
            )));
        }
        let image = ImageRoi::new(region.x, region.y, raster);
        debug!(
            mask = %mask.type_tag(),
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            foreground = image.foreground_count(),
            "rasterized mask"
        );
        Ok(Roi::image(image).into_ref())
    }
}

pub fn descriptor() -> ConverterDescriptor {
    ConverterDescriptor::new(
        "mask_to_image_roi",
        TypeTag::Mask,
        TypeTag::ImageRoi,
        |service: &ConvertService, value: &Value| {
            let mask = value
                .as_mask()
                .ok_or_else(|| BridgeError::illegal("expected a mask"))?;
            let rasterizer = service
                .rasterizer()
                .ok_or_else(|| BridgeError::illegal("no rasterizer is available"))?;
            Ok(RasterFallbackConverter::new(rasterizer).convert(mask)?.into())
        },
    )
    .with_priority(priority::LOW)
    .lossy()
    .when(|service, _| service.rasterizer().is_some())
    .when(|_, value| value.as_mask().is_some_and(RasterFallbackConverter::supports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{EllipsoidMask, PredicateMask};

    fn diagonal(min: [f64; 2], max: [f64; 2]) -> MaskRef {
        let bounds = RealInterval::new(min.to_vec(), max.to_vec()).unwrap();
        PredicateMask::new(bounds, |p| (p[0] + p[1]) % 2.0 == 0.0).into()
    }

    #[test]
    fn region_includes_both_floors() {
        let bounds = RealInterval::new(vec![-1.5, 2.0], vec![3.2, 2.0]).unwrap();
        let region = RasterRegion::covering(&bounds).unwrap();
        assert_eq!(
            region,
            RasterRegion {
                x: -2,
                y: 2,
                width: 6,
                height: 1
            }
        );
        assert!(RasterRegion::covering(&RealInterval::unbounded(2)).is_err());
        let huge = RealInterval::new(vec![0.0, 0.0], vec![1e5, 1e5]).unwrap();
        assert!(RasterRegion::covering(&huge).unwrap_err().is_illegal_argument());
    }

    #[test]
    fn raster_matches_predicate_on_grid() {
        let service = ConvertService::new();
        for (min, max) in [([0.0, 0.0], [12.0, 24.0]), ([12.0, 10.0], [50.0, 72.0])] {
            let mask = diagonal(min, max);
            let roi = service.convert_to_roi(mask.clone(), TypeTag::Roi).unwrap();
            assert_eq!(roi.kind(), crate::legacy::RoiKind::Image);
            let bounds = roi.borrow().bounds();
            assert_eq!((bounds.x, bounds.y), (min[0] as i32, min[1] as i32));
            assert_eq!(bounds.width, (max[0] - min[0]) as i32 + 1);
            for x in min[0] as i32..=max[0] as i32 {
                for y in min[1] as i32..=max[1] as i32 {
                    assert_eq!(
                        roi.contains(x, y),
                        mask.test(&[x as f64, y as f64]),
                        "pixel ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn needs_rasterizer_and_finite_bounds() {
        let mask = diagonal([0.0, 0.0], [4.0, 4.0]);
        let value = Value::from(mask);
        let service = ConvertService::new().without_rasterizer();
        assert!(service.handler(&value, TypeTag::ImageRoi).is_none());

        let open: MaskRef = EllipsoidMask::sphere(vec![0.0, 0.0], 1.0)
            .unwrap()
            .into();
        let negated = Value::from(open.negate().unwrap());
        assert!(ConvertService::new().handler(&negated, TypeTag::Roi).is_none());
        let err = RasterFallbackConverter::new(&PredicateRasterizer)
            .convert(negated.as_mask().unwrap())
            .unwrap_err();
        assert!(err.is_illegal_argument());
    }
}

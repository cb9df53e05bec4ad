use std::fmt;

use tracing::trace;

use crate::{
    error::{BridgeError, Result},
    geometry::narrow,
    legacy::{Roi, RoiKind, RoiRef},
    mask::MaskRef,
    traits::Wrapper,
    wrap::{
        SyncState,
        sync::{PointsTarget, VertexTarget, reconcile},
    },
};

/// What a roi remembers about the mask it mirrors.
pub(crate) struct MaskBinding {
    pub(crate) source: MaskRef,
    /// Element count at the last synchronization.
    pub(crate) synced: usize,
    pub(crate) state: SyncState,
}

impl fmt::Debug for MaskBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskBinding")
            .field("source", &self.source.type_tag())
            .field("synced", &self.synced)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A writable mask exposed as a legacy roi.
///
/// The roi is built once from the mask; afterwards edits go through the roi
/// and reach the mask on [`Wrapper::synchronize`].
#[derive(Debug, Clone)]
pub struct MaskRoi {
    roi: RoiRef,
    source: MaskRef,
}

impl MaskRoi {
    /// Wrap a writable 2-D mask. Points added to a point collection are
    /// built with the collection's own factory.
    pub fn new(source: MaskRef) -> Result<Self> {
        if source.num_dimensions() != 2 {
            return Err(BridgeError::illegal(format!(
                "only 2-D masks can be shown as a roi, got {} dimensions",
                source.num_dimensions()
            )));
        }
        if !source.is_writable() {
            return Err(BridgeError::illegal(format!(
                "{} is read-only and cannot back a live roi",
                source.type_tag()
            )));
        }
        let mut roi = match &source {
            MaskRef::Box(m) => {
                let m = m.borrow();
                let (min, max) = (m.interval().min(), m.interval().max());
                Roi::rectangle(min[0], min[1], max[0] - min[0], max[1] - min[1])
            }
            MaskRef::Ellipsoid(m) => {
                let m = m.borrow();
                let (c, r) = (m.center(), m.semi_axes());
                Roi::oval(c[0] - r[0], c[1] - r[1], 2.0 * r[0], 2.0 * r[1])
            }
            MaskRef::Line(m) => {
                let m = m.borrow();
                let (one, two) = (m.endpoint_one(), m.endpoint_two());
                Roi::line(one[0], one[1], two[0], two[1])
            }
            MaskRef::Point(m) => {
                let m = m.borrow();
                let p = m.position();
                Roi::points(vec![[p[0] as f32, p[1] as f32]])
            }
            MaskRef::Points(m) => Roi::points(
                m.borrow()
                    .points()
                    .map(|p| [p.position()[0] as f32, p.position()[1] as f32])
                    .collect(),
            ),
            MaskRef::Polygon(m) => Roi::polygon(RoiKind::Polygon, narrow(m.borrow().vertices()))?,
            MaskRef::Polyline(m) => {
                Roi::polygon(RoiKind::Polyline, narrow(m.borrow().vertices()))?
            }
            other => {
                return Err(BridgeError::illegal(format!(
                    "no roi face for {}",
                    other.type_tag()
                )));
            }
        };
        roi.binding = Some(MaskBinding {
            source: source.clone(),
            synced: roi.n_coordinates(),
            state: SyncState::Synchronized,
        });
        Ok(Self {
            roi: roi.into_ref(),
            source,
        })
    }

    pub fn roi(&self) -> &RoiRef {
        &self.roi
    }

    pub fn into_roi(self) -> RoiRef {
        self.roi
    }
}

impl RoiRef {
    /// The wrapper this roi belongs to, if it mirrors a mask.
    pub fn as_mask_wrapper(&self) -> Option<MaskRoi> {
        let source = self.borrow().binding.as_ref()?.source.clone();
        Some(MaskRoi {
            roi: self.clone(),
            source,
        })
    }
}

impl Wrapper for MaskRoi {
    type Source = MaskRef;

    fn source(&self) -> MaskRef {
        self.source.clone()
    }

    fn synchronize(&self) -> Result<()> {
        let (current, frame, endpoints, last_synced) = {
            let roi = self.roi.borrow();
            let Some(binding) = roi.binding.as_ref() else {
                return Err(BridgeError::illegal("roi is no longer bound to a mask"));
            };
            if binding.state == SyncState::Synchronized {
                return Ok(());
            }
            (
                roi.vertices(),
                [roi.x_base(), roi.y_base(), roi.float_width(), roi.float_height()],
                roi.line_endpoints(),
                binding.synced,
            )
        };
        let [x, y, w, h] = frame;
        match &self.source {
            MaskRef::Box(m) => {
                let mut mask = m.write()?;
                mask.set_side_length(0, w)?;
                mask.set_side_length(1, h)?;
                mask.set_center(&[x + w / 2.0, y + h / 2.0])?;
            }
            MaskRef::Ellipsoid(m) => {
                let mut mask = m.write()?;
                mask.set_center(&[x + w / 2.0, y + h / 2.0])?;
                mask.set_semi_axis_length(0, w / 2.0)?;
                mask.set_semi_axis_length(1, h / 2.0)?;
            }
            MaskRef::Line(m) => {
                if let Some((one, two)) = endpoints {
                    let mut mask = m.write()?;
                    mask.set_endpoint_one(&one)?;
                    mask.set_endpoint_two(&two)?;
                }
            }
            MaskRef::Point(m) => {
                if let Some(first) = current.first() {
                    m.write()?.set_position(first)?;
                }
            }
            MaskRef::Points(m) => {
                let mut collection = m.write()?;
                let factory = collection.point_factory();
                reconcile(
                    &current,
                    last_synced,
                    &mut PointsTarget {
                        collection: &mut *collection,
                        factory,
                    },
                );
            }
            MaskRef::Polygon(m) => {
                let mut polygon = m.write()?;
                reconcile(
                    &current,
                    last_synced,
                    &mut VertexTarget {
                        vertices: polygon.vertices_mut(),
                    },
                );
            }
            MaskRef::Polyline(m) => {
                let mut polyline = m.write()?;
                reconcile(
                    &current,
                    last_synced,
                    &mut VertexTarget {
                        vertices: polyline.vertices_mut(),
                    },
                );
            }
            other => {
                return Err(BridgeError::unsupported(format!(
                    "synchronize into {}",
                    other.type_tag()
                )));
            }
        }
        let mut roi = self.roi.borrow_mut();
        let count = roi.n_coordinates();
        if let Some(binding) = roi.binding.as_mut() {
            binding.synced = count;
            binding.state = SyncState::Synchronized;
        }
        trace!(target_mask = %self.source.type_tag(), count, "synchronized");
        Ok(())
    }

    fn state(&self) -> SyncState {
        self.roi
            .borrow()
            .binding
            .as_ref()
            .map_or(SyncState::Synchronized, |b| b.state)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{
        mask::{
            BoxMask, EllipsoidMask, LineMask, PointCollection, PointFactory, PointMask,
            PolygonMask, RealPoint, Shared,
        },
        traits::CollectionPoint,
    };

    #[test]
    fn box_follows_roi_moves() {
        let source: MaskRef = BoxMask::new(vec![0.0, 0.0], vec![4.0, 2.0]).unwrap().into();
        let wrapper = MaskRoi::new(source.clone()).unwrap();
        assert_eq!(wrapper.roi().kind(), RoiKind::Rectangle);
        assert!(wrapper.roi().borrow().is_mask_wrapper());

        wrapper.roi().borrow_mut().translate(10.0, 5.0);
        assert_eq!(wrapper.state(), SyncState::Unsynchronized);
        // pending edits are not visible through the mask yet
        assert!(!source.test(&[11.0, 6.0]));

        let updated = wrapper.updated_source().unwrap();
        assert!(updated.ptr_eq(&source));
        assert_eq!(wrapper.state(), SyncState::Synchronized);
        assert!(source.test(&[11.0, 6.0]));
        assert_eq!(source.real_max(0).unwrap(), 14.0);
    }

    #[test]
    fn ellipsoid_and_line_sync_fields() {
        let ellipse: MaskRef = EllipsoidMask::new(vec![5.0, 5.0], vec![2.0, 1.0]).unwrap().into();
        let wrapper = MaskRoi::new(ellipse.clone()).unwrap();
        assert_eq!(wrapper.roi().borrow().x_base(), 3.0);
        wrapper.roi().borrow_mut().set_size(8.0, 2.0).unwrap();
        wrapper.synchronize().unwrap();
        let (center, semi) = ellipse.ellipsoid_params().unwrap();
        assert_eq!(center, vec![7.0, 5.0]);
        assert_eq!(semi, vec![4.0, 1.0]);

        let line: MaskRef = LineMask::new(vec![0.0, 0.0], vec![3.0, 4.0]).unwrap().into();
        let wrapper = MaskRoi::new(line.clone()).unwrap();
        wrapper.roi().borrow_mut().move_vertex(1, 6.0, 8.0).unwrap();
        wrapper.synchronize().unwrap();
        assert_eq!(line.line_endpoints().unwrap().1, vec![6.0, 8.0]);
    }

    #[test]
    fn single_point_takes_first_vertex() {
        let point: MaskRef = PointMask::new(vec![1.0, 2.0]).unwrap().into();
        let wrapper = MaskRoi::new(point.clone()).unwrap();
        wrapper.roi().borrow_mut().move_vertex(0, 3.0, 4.0).unwrap();
        wrapper.synchronize().unwrap();
        assert!(point.test(&[3.0, 4.0]));
    }

    #[test]
    fn polygon_vertices_append_on_sync() {
        let polygon: MaskRef =
            PolygonMask::new(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]]).into();
        let wrapper = MaskRoi::new(polygon.clone()).unwrap();
        wrapper.roi().borrow_mut().add_point(0.0, 4.0).unwrap();
        wrapper.synchronize().unwrap();
        assert_eq!(polygon.polygon_vertices().unwrap().len(), 4);
        assert!(polygon.test(&[1.0, 3.5]));

        let before = polygon.polygon_vertices().unwrap();
        wrapper.synchronize().unwrap();
        assert_eq!(polygon.polygon_vertices().unwrap(), before);
    }

    #[test]
    fn collection_factory_builds_new_points() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let factory: PointFactory = Rc::new(move |position: &[f64]| {
            counter.set(counter.get() + 1);
            Box::new(RealPoint::new(position.to_vec())) as Box<dyn CollectionPoint>
        });
        let source: MaskRef = PointCollection::new(2, vec![vec![1.0, 1.0]])
            .unwrap()
            .with_factory(factory)
            .into();
        let wrapper = MaskRoi::new(source.clone()).unwrap();
        wrapper.roi().borrow_mut().add_point(2.0, 2.0).unwrap();
        wrapper.synchronize().unwrap();
        assert_eq!(source.point_positions().unwrap().len(), 2);
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn rejects_read_only_and_flat_masks() {
        let shared = Shared::new(BoxMask::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap());
        let frozen = MaskRef::from(shared.read_only());
        assert!(MaskRoi::new(frozen).unwrap_err().is_illegal_argument());

        let flat: MaskRef = BoxMask::new(vec![0.0], vec![1.0]).unwrap().into();
        assert!(MaskRoi::new(flat).unwrap_err().is_illegal_argument());
    }

    #[test]
    fn roi_finds_its_wrapper() {
        let source: MaskRef = PointMask::new(vec![0.0, 0.0]).unwrap().into();
        let roi = MaskRoi::new(source.clone()).unwrap().into_roi();
        let wrapper = roi.as_mask_wrapper().unwrap();
        assert!(wrapper.source().ptr_eq(&source));
        assert!(Roi::points(vec![]).into_ref().as_mask_wrapper().is_none());
    }
}

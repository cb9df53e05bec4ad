//! Live views across the two models.
//!
//! [`RoiMask`] exposes a legacy roi through the mask contract and
//! [`MaskRoi`] exposes a writable mask as a legacy roi. Neither copies the
//! wrapped object; [`crate::Wrapper::source`] hands back the same instance.

pub mod mask_roi;
pub mod roi_mask;
pub mod sync;

pub use mask_roi::MaskRoi;
pub use roi_mask::{RoiFace, RoiMask};
pub use sync::reconcile;

/// Whether edits made through a wrapper have reached its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SyncState {
    #[default]
    Synchronized,
    Unsynchronized,
}

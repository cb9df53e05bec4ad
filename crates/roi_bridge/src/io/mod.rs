//! Export of legacy rois.

pub mod features;

pub use features::{
    RoiFeatureProperties, feature_collection, roi_feature, roi_geometry, save_geojson,
    to_geojson_string,
};

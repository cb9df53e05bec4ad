use thiserror::Error;

use crate::types::TypeTag;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Invalid dimension {dimension} for {dims}-dimensional geometry")]
    InvalidDimension { dimension: usize, dims: usize },

    #[error("No converter from {value} to {target}")]
    NoConverter { value: String, target: TypeTag },

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),
}

impl BridgeError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation(operation.into())
    }

    pub fn illegal(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }

    /// True for every variant a caller should treat as a bad argument.
    pub fn is_illegal_argument(&self) -> bool {
        matches!(
            self,
            Self::IllegalArgument(_) | Self::InvalidDimension { .. } | Self::NoConverter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

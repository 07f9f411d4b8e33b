use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("location services unavailable: {0}")]
    Unavailable(String),
    #[error("position subscription rejected: {0}")]
    Subscribe(String),
    #[error("no position fix available")]
    NoFix,
    #[error("failed to read GPX track: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to open track file: {0}")]
    Io(#[from] io::Error),
}

/// A single failed delivery. Never ends the subscription.
#[derive(Debug, Clone, Error)]
#[error("position sample failed: {0}")]
pub struct SampleError(pub String);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("location permission was not granted")]
    PermissionDenied,
    #[error("location permission has not been requested yet")]
    PermissionUnresolved,
    #[error("could not start tracking: {0}")]
    Subscription(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to serialize renderer payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to write GPX file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

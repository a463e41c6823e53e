//! Group sync error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GroupError>;

/// Failures of a [`crate::StateStore`] backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("device model error: {0}")]
    Device(#[from] tradfri_devices::DeviceError),

    #[error("configuration error: {0}")]
    Config(String),
}

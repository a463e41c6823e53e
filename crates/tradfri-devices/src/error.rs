//! Device model error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("codec error: {0}")]
    Codec(#[from] tradfri_core::Error),
}

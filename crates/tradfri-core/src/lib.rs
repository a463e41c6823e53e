//! Tradfri Core
//!
//! Wire values and the metadata-driven object codec used to talk to
//! Tradfri gateways.
//!
//! This crate provides:
//! - The wire representation ([`Value`], [`WireObject`])
//! - Per-type property metadata ([`PropertyTable`], [`PropertyDescriptor`])
//! - Typed model objects ([`IpsoObject`], [`PropertyValue`], [`PropertyRef`])
//! - Parse / serialize / merge / duplicate over those objects ([`codec`])

pub mod codec;
pub mod error;
pub mod object;
pub mod registry;
pub mod types;

pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use object::{IpsoObject, IpsoObjectExt, PropertyRef, PropertyValue};
pub use registry::{
    DeserializeFn, PropertyDescriptor, PropertyTable, PropertyTableBuilder, SerializeFn, ValueKind,
};
pub use types::{Value, WireObject};

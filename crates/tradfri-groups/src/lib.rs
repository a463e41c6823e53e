//! Tradfri Groups
//!
//! Derives the state of light groups from their members and keeps it in a
//! persisted state store.
//!
//! - [`GroupAggregator`] tracks devices and group definitions, computes the
//!   per-attribute [`Consensus`] of each group and writes changes after a
//!   debounce window
//! - [`StateStore`] is the persistence seam; [`MemoryStore`] implements it
//!   in-process
//! - [`objects`] defines the persisted group channels and their states

pub mod aggregator;
pub mod config;
pub mod consensus;
pub mod debounce;
pub mod error;
pub mod event;
pub mod objects;
pub mod store;

pub use aggregator::GroupAggregator;
pub use config::GroupSyncConfig;
pub use consensus::Consensus;
pub use debounce::Debouncer;
pub use error::{GroupError, Result, StoreError};
pub use event::StateChange;
pub use objects::{GroupAttribute, GroupKey, GroupState, VirtualGroup};
pub use store::{
    MemoryStore, ObjectCommon, ObjectKind, ObjectNative, ObjectPatch, StateStore, StoreResult,
    StoreWrite, StoredObject,
};

//! `datahub-core`: the resource tree, push engine, handler registry, and
//! observation buffers that make up the on-device routing core (spec §1).
//! [`hub::DataHub`] is the facade the IPC framing layer calls into; the
//! other modules are its internal building blocks, exposed `pub` so tests
//! and embedders can exercise them directly.

pub mod handlers;
pub mod hub;
pub mod observation;
pub mod push;
pub mod resource;
pub mod tree;

pub use hub::DataHub;

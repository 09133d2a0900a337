//! Core value model, error taxonomy, configuration, and structured events
//! shared by every Data Hub crate.
//!
//! This crate has no routing logic of its own — it defines the vocabulary
//! (`Sample`, `DataType`, `HubFault`, `HubConfig`, `HubEvent`) that the tree,
//! push engine, and session layer in `datahub-core` build on.

pub mod config;
pub mod error;
pub mod event;
pub mod path;
pub mod value;

pub use config::HubConfig;
pub use error::HubFault;
pub use event::HubEvent;
pub use value::{DataType, Sample, SampleValue};

//! Rill Dataflow - pluggable task I/O
//!
//! This crate provides the registration and construction surface for
//! dataflow task inputs and outputs:
//! - typed settings envelopes carried inside plan descriptors
//! - source/sink driver contracts implemented by connectors
//! - factories that turn descriptors into live driver/runtime pairs

pub mod descriptor;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod runtime;

pub use descriptor::{IoEvent, SinkArguments, SinkDescriptor, SourceArguments, SourceDescriptor};
pub use driver::{SinkDriver, SourceDriver};
pub use envelope::{ConnectorSettings, SettingsAny};
pub use error::FactoryError;
pub use factory::{SinkFactory, SinkPair, SourceFactory, SourcePair};
pub use runtime::{Lifecycle, RuntimeHandle};

//! Source and sink factories: typed creator registration and descriptor
//! dispatch.
//!
//! Factories are assembled once at startup, while the process is still
//! single-task, then shared read-only behind an `Arc`. `create` takes
//! `&self` and no lock.

use std::collections::HashMap;

use tracing::info;

use crate::descriptor::{SinkArguments, SourceArguments};
use crate::driver::{SinkDriver, SourceDriver};
use crate::envelope::{ConnectorSettings, SettingsAny};
use crate::error::FactoryError;
use crate::runtime::RuntimeHandle;

/// A live source: the task-facing driver and its runtime task.
///
/// Both halves belong to the caller from the moment a creator returns.
pub type SourcePair = (Box<dyn SourceDriver>, RuntimeHandle);

/// A live sink, same ownership contract as [`SourcePair`].
pub type SinkPair = (Box<dyn SinkDriver>, RuntimeHandle);

type Creator<Args, Pair> = Box<dyn Fn(Args) -> anyhow::Result<Pair> + Send + Sync>;

// ---------------------------------------------------------------------------
// Shared registry core
// ---------------------------------------------------------------------------

/// Keyed creator registry. Sources and sinks get one each so the two
/// dispatch paths cannot drift apart.
struct Registry<Args, Pair> {
    kind: &'static str,
    creators: HashMap<String, Creator<Args, Pair>>,
}

impl<Args, Pair> Registry<Args, Pair> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            creators: HashMap::new(),
        }
    }

    fn insert(
        &mut self,
        type_name: &str,
        creator: Creator<Args, Pair>,
    ) -> Result<(), FactoryError> {
        if type_name.is_empty() {
            return Err(FactoryError::EmptyTypeName);
        }
        if self.creators.contains_key(type_name) {
            return Err(FactoryError::DuplicateRegistration(type_name.to_string()));
        }
        self.creators.insert(type_name.to_string(), creator);
        info!("Registered {} type '{}'", self.kind, type_name);
        Ok(())
    }

    fn create(&self, type_name: &str, args: Args) -> Result<Pair, FactoryError> {
        let creator = self
            .creators
            .get(type_name)
            .ok_or_else(|| FactoryError::UnknownConnectorType(type_name.to_string()))?;
        creator(args).map_err(|e| match e.downcast::<FactoryError>() {
            // Envelope faults raised by the typed adapter keep their shape.
            Ok(fault) => fault,
            Err(other) => FactoryError::CreatorFailed {
                type_name: type_name.to_string(),
                message: format!("{:#}", other),
            },
        })
    }

    fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Check the envelope's declared type and decode it for a typed creator.
fn unpack<S: ConnectorSettings>(
    type_name: &str,
    envelope: &SettingsAny,
) -> anyhow::Result<S> {
    if !envelope.is::<S>() {
        return Err(FactoryError::SettingsTypeMismatch {
            type_name: type_name.to_string(),
            expected: S::TYPE_URL.to_string(),
            actual: envelope.type_url.clone(),
        }
        .into());
    }
    match envelope.decode::<S>() {
        Ok(settings) => Ok(settings),
        Err(e) => Err(FactoryError::SettingsDecodeFailure {
            type_name: type_name.to_string(),
            message: e.to_string(),
        }
        .into()),
    }
}

// ---------------------------------------------------------------------------
// Source factory
// ---------------------------------------------------------------------------

/// Registry of source creators keyed by the plan's source type name.
pub struct SourceFactory {
    inner: Registry<SourceArguments, SourcePair>,
}

impl SourceFactory {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("source"),
        }
    }

    /// Register a creator that unpacks its own settings.
    pub fn register_raw<F>(&mut self, type_name: &str, creator: F) -> Result<(), FactoryError>
    where
        F: Fn(SourceArguments) -> anyhow::Result<SourcePair> + Send + Sync + 'static,
    {
        self.inner.insert(type_name, Box::new(creator))
    }

    /// Register a typed creator.
    ///
    /// The envelope must declare `S::TYPE_URL` and decode cleanly before
    /// the creator runs; the creator never re-validates its input shape.
    pub fn register<S, F>(&mut self, type_name: &str, creator: F) -> Result<(), FactoryError>
    where
        S: ConnectorSettings + 'static,
        F: Fn(S, SourceArguments) -> anyhow::Result<SourcePair> + Send + Sync + 'static,
    {
        let registered_as = type_name.to_string();
        self.register_raw(type_name, move |args: SourceArguments| {
            let settings = unpack::<S>(&registered_as, &args.descriptor.settings)?;
            creator(settings, args)
        })
    }

    /// Build a live source for a plan descriptor.
    pub fn create(&self, args: SourceArguments) -> Result<SourcePair, FactoryError> {
        let type_name = args.descriptor.source_type.clone();
        self.inner.create(&type_name, args)
    }

    /// Registered type names, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        self.inner.registered_types()
    }
}

impl Default for SourceFactory {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Sink factory
// ---------------------------------------------------------------------------

/// Registry of sink creators keyed by the plan's sink type name.
pub struct SinkFactory {
    inner: Registry<SinkArguments, SinkPair>,
}

impl SinkFactory {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("sink"),
        }
    }

    /// Register a creator that unpacks its own settings.
    pub fn register_raw<F>(&mut self, type_name: &str, creator: F) -> Result<(), FactoryError>
    where
        F: Fn(SinkArguments) -> anyhow::Result<SinkPair> + Send + Sync + 'static,
    {
        self.inner.insert(type_name, Box::new(creator))
    }

    /// Register a typed creator, see [`SourceFactory::register`].
    pub fn register<S, F>(&mut self, type_name: &str, creator: F) -> Result<(), FactoryError>
    where
        S: ConnectorSettings + 'static,
        F: Fn(S, SinkArguments) -> anyhow::Result<SinkPair> + Send + Sync + 'static,
    {
        let registered_as = type_name.to_string();
        self.register_raw(type_name, move |args: SinkArguments| {
            let settings = unpack::<S>(&registered_as, &args.descriptor.settings)?;
            creator(settings, args)
        })
    }

    /// Build a live sink for a plan descriptor.
    pub fn create(&self, args: SinkArguments) -> Result<SinkPair, FactoryError> {
        let type_name = args.descriptor.sink_type.clone();
        self.inner.create(&type_name, args)
    }

    /// Registered type names, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        self.inner.registered_types()
    }
}

impl Default for SinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

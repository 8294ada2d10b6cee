//! Discriminator lookup and polymorphic materialization
//!
//! The [`TypeRegistry`] is built once, then frozen: it is only ever read at
//! decode time and can be shared between threads without locking.

mod materializer;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use materializer::ObjectMaterializer;

use crate::config::{self, DecoderConfig};
use crate::objects::catalog::builtin_registry;
use crate::objects::{ObjectHandle, ObjectKind, ServiceObject};
use crate::types::error::{EwsError, Result};

/// Produces an empty instance of a concrete type
pub type ObjectFactory = fn() -> ObjectHandle;

/// What to do when a discriminator has no registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Skip the node and keep decoding
    Skip,
    /// Fail with `UnresolvedDiscriminator`
    Fail,
}

/// Field completeness requested for materialized objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Listing views: expensive fields (body, MIME content, attachments) are
    /// ignored
    #[default]
    Summary,
    Full,
}

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    kind: ObjectKind,
    factory: ObjectFactory,
}

/// Collects registrations at startup
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    entries: BTreeMap<String, RegistryEntry>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a discriminator
    ///
    /// Registering the same discriminator twice is a programming error and
    /// fails with `DuplicateDiscriminator`.
    pub fn register(
        &mut self,
        discriminator: &str,
        kind: ObjectKind,
        factory: ObjectFactory,
    ) -> Result<&mut Self> {
        if self.entries.contains_key(discriminator) {
            return Err(EwsError::DuplicateDiscriminator(discriminator.to_string()));
        }
        self.entries
            .insert(discriminator.to_string(), RegistryEntry { kind, factory });
        Ok(self)
    }

    /// Register a type under its own wire name
    pub fn register_type<T: ServiceObject + Default>(&mut self) -> Result<&mut Self> {
        let sample = T::default();
        self.register(sample.wire_name(), sample.kind(), create::<T>)
    }

    pub fn build(self) -> TypeRegistry {
        info!("Type registry built with {} types", self.entries.len());
        TypeRegistry {
            entries: self.entries,
        }
    }
}

fn create<T: ServiceObject + Default>() -> ObjectHandle {
    Box::new(T::default())
}

/// Frozen discriminator table
#[derive(Debug)]
pub struct TypeRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

static GLOBAL: Lazy<TypeRegistry> =
    Lazy::new(|| builtin_registry().expect("built-in catalog registers each type once"));

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Process-wide registry holding the built-in catalog
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    pub fn resolve(&self, discriminator: &str) -> Option<ObjectKind> {
        self.entries.get(discriminator).map(|entry| entry.kind)
    }

    /// Create an empty instance, optionally restricted to one family
    pub fn create(&self, discriminator: &str, expected: Option<ObjectKind>) -> Option<ObjectHandle> {
        let entry = self.entries.get(discriminator)?;
        if expected.is_some_and(|kind| kind != entry.kind) {
            return None;
        }
        Some((entry.factory)())
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.entries.contains_key(discriminator)
    }

    /// Registered discriminators, in lexical order
    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-call decode settings
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'r> {
    pub registry: &'r TypeRegistry,
    pub projection: Projection,
    /// Policy for unknown types among the members of a collection
    pub collection_policy: UnresolvedPolicy,
    /// Policy for unknown types where one object is mandatory
    pub single_object_policy: UnresolvedPolicy,
    pub remap_error_messages: bool,
}

impl<'r> DecodeContext<'r> {
    /// Context with the policies of the global configuration
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self::from_config(registry, &config::get_config())
    }

    pub fn from_config(registry: &'r TypeRegistry, config: &DecoderConfig) -> Self {
        Self {
            registry,
            projection: Projection::Summary,
            collection_policy: config.collection_policy,
            single_object_policy: config.single_object_policy,
            remap_error_messages: config.remap_error_messages,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_collection_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.collection_policy = policy;
        self
    }

    pub fn with_single_object_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.single_object_policy = policy;
        self
    }
}

impl DecodeContext<'static> {
    /// Context over the global registry
    pub fn global() -> Self {
        Self::new(TypeRegistry::global())
    }
}

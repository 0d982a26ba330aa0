//! Collaborator lookup tables
//!
//! Resolvers are looked up by tag (the empty tag is the default
//! resolver); document builders by the object's `kind()`, falling back
//! to a catch-all builder. Registration may happen while the worker
//! runs.

use crate::builder::DefaultDocumentBuilder;
use dashmap::DashMap;
use parking_lot::RwLock;
use scribe_core::{DocumentBuilder, Resolver, ResolverTag, ScribeError, ScribeResult};
use std::sync::Arc;

/// Resolvers by tag and document builders by object kind
pub struct Registry {
    resolvers: DashMap<ResolverTag, Arc<dyn Resolver>>,
    builders: DashMap<String, Arc<dyn DocumentBuilder>>,
    fallback: RwLock<Option<Arc<dyn DocumentBuilder>>>,
}

impl Registry {
    /// Empty registry whose fallback builder is `DefaultDocumentBuilder`
    pub fn new() -> Self {
        Self {
            resolvers: DashMap::new(),
            builders: DashMap::new(),
            fallback: RwLock::new(Some(Arc::new(DefaultDocumentBuilder))),
        }
    }

    /// Register `resolver` under `tag`, replacing any previous one
    pub fn register_resolver(&self, tag: ResolverTag, resolver: Arc<dyn Resolver>) {
        self.resolvers.insert(tag, resolver);
    }

    /// Register the resolver used when a record carries the empty tag
    pub fn register_default_resolver(&self, resolver: Arc<dyn Resolver>) {
        self.register_resolver(ResolverTag::default_resolver(), resolver);
    }

    /// Resolver registered under `tag`
    ///
    /// # Errors
    /// `UnknownResolver` if nothing is registered under `tag`.
    pub fn resolver(&self, tag: &ResolverTag) -> ScribeResult<Arc<dyn Resolver>> {
        self.resolvers
            .get(tag)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| ScribeError::UnknownResolver {
                tag: tag.as_str().to_string(),
            })
    }

    /// Register a builder for objects whose `kind()` is `kind`
    pub fn register_builder(&self, kind: impl Into<String>, builder: Arc<dyn DocumentBuilder>) {
        self.builders.insert(kind.into(), builder);
    }

    /// Replace the catch-all builder; `None` makes unknown kinds an error
    pub fn set_fallback_builder(&self, builder: Option<Arc<dyn DocumentBuilder>>) {
        *self.fallback.write() = builder;
    }

    /// Builder for objects of `kind`
    ///
    /// # Errors
    /// `NoBuilder` if no builder is registered for `kind` and there is no
    /// fallback.
    pub fn builder(&self, kind: &str) -> ScribeResult<Arc<dyn DocumentBuilder>> {
        if let Some(builder) = self.builders.get(kind) {
            return Ok(Arc::clone(builder.value()));
        }
        self.fallback
            .read()
            .clone()
            .ok_or_else(|| ScribeError::NoBuilder {
                kind: kind.to_string(),
            })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("resolvers", &self.resolvers.len())
            .field("builders", &self.builders.len())
            .field("fallback", &self.fallback.read().is_some())
            .finish()
    }
}

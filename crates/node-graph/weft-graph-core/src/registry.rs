//! Static component dispatch table.
//!
//! Component families contribute entries through [`ComponentRegistryBuilder`];
//! the built registry is immutable and shared by reference (`Arc`) between
//! engines.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::component::{Component, RegisteredComponent};
use crate::types::NodeIdentity;

/// Trimmed, lowercase registry key.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[derive(Default)]
pub struct ComponentRegistryBuilder {
    entries: HashMap<String, Arc<RegisteredComponent>>,
}

impl ComponentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `component` under every key. A key registered earlier is
    /// replaced, so the last registration wins.
    pub fn register<C>(&mut self, keys: &[&str], component: C) -> &mut Self
    where
        C: Component + 'static,
    {
        let entry = Arc::new(RegisteredComponent::new(Box::new(component)));
        for key in keys {
            let key = normalize_key(key);
            if key.is_empty() {
                continue;
            }
            if self.entries.insert(key.clone(), Arc::clone(&entry)).is_some() {
                log::debug!("component key '{key}' re-registered");
            }
        }
        self
    }

    /// Run a family registration function against this builder.
    pub fn with_family(mut self, family: fn(&mut ComponentRegistryBuilder)) -> Self {
        family(&mut self);
        self
    }

    pub fn build(self) -> ComponentRegistry {
        ComponentRegistry {
            entries: self.entries,
        }
    }
}

#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<String, Arc<RegisteredComponent>>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("keys", &self.entries.len())
            .finish()
    }
}

impl ComponentRegistry {
    pub fn builder() -> ComponentRegistryBuilder {
        ComponentRegistryBuilder::new()
    }

    /// Registry holding the built-in component family.
    pub fn with_builtins() -> Self {
        ComponentRegistryBuilder::new()
            .with_family(crate::builtin::register)
            .build()
    }

    /// Guid first, then name, then nickname.
    pub fn lookup(&self, identity: &NodeIdentity) -> Option<&Arc<RegisteredComponent>> {
        identity
            .guid
            .as_deref()
            .and_then(|g| self.lookup_key(g))
            .or_else(|| self.lookup_key(&identity.name))
            .or_else(|| identity.nickname.as_deref().and_then(|n| self.lookup_key(n)))
    }

    pub fn lookup_key(&self, key: &str) -> Option<&Arc<RegisteredComponent>> {
        self.entries.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

//! Scoped, write-once value storage.
//!
//! A [`Context`] maps names to shared values and optionally borrows a parent
//! scope. Writes always land in the innermost scope and may not overwrite a
//! name already defined there; reads walk outward through the parents. A
//! subgraph invocation gets a child context whose lifetime is bounded by the
//! caller's borrow, so the parent always outlives it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GraphError;
use crate::Result;

pub struct Context<'p, V> {
    values: HashMap<String, Arc<V>>,
    parent: Option<&'p Context<'p, V>>,
}

impl<V> Context<'static, V> {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            parent: None,
        }
    }
}

impl<V> Default for Context<'static, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p, V> Context<'p, V> {
    /// A new empty scope that falls back to `self` for lookups.
    pub fn child(&self) -> Context<'_, V> {
        Context {
            values: HashMap::new(),
            parent: Some(self),
        }
    }

    pub fn parent(&self) -> Option<&'p Context<'p, V>> {
        self.parent
    }

    /// Define `name` in this scope. Names are write-once per scope; shadowing a
    /// parent's name is allowed.
    pub fn insert(&mut self, name: impl Into<String>, value: Arc<V>) -> Result<()> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(GraphError::DuplicateValue { name });
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Resolve `name` here or in the nearest enclosing scope.
    pub fn lookup(&self, name: &str) -> Option<&Arc<V>> {
        let mut scope = Some(self);
        while let Some(ctx) = scope {
            if let Some(v) = ctx.values.get(name) {
                return Some(v);
            }
            scope = ctx.parent;
        }
        None
    }

    /// Like [`lookup`](Self::lookup) but returns a new handle, failing when absent.
    pub fn get(&self, name: &str) -> Result<Arc<V>> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| GraphError::MissingValue { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Whether `name` is defined in this scope (ignoring parents).
    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Drop `name` from this scope only. Parents are never touched and an
    /// absent name is not an error.
    pub fn remove(&mut self, name: &str) -> Option<Arc<V>> {
        self.values.remove(name)
    }

    /// Number of values defined in this scope.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names defined in this scope, in no particular order.
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<V> std::fmt::Debug for Context<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.local_names().collect();
        names.sort_unstable();
        f.debug_struct("Context")
            .field("values", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

//! Style descriptors and the applier contract the host implements.
//!
//! The core never interprets a [`StyleDescriptor`]; it only forwards it to the
//! host's [`StyleApplier`] alongside the [`Match`] it belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::scanner::Match;

/// Opaque bag of rendering attributes (color, decoration flags, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleDescriptor(Value);

impl StyleDescriptor {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Shorthand for `{ "color": <color> }`
    pub fn color(color: impl Into<String>) -> Self {
        Self(serde_json::json!({ "color": color.into() }))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

impl From<Value> for StyleDescriptor {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Host-side annotation adapter.
///
/// Both calls must be idempotent: removing an absent annotation is a no-op and
/// applying an already-applied match identity changes nothing. The engine
/// never applies the same identity twice without a `remove` in between and
/// never removes an identity it did not apply.
pub trait StyleApplier {
    fn apply(&mut self, m: &Match, style: &StyleDescriptor);
    fn remove(&mut self, m: &Match);
}

impl<A: StyleApplier + ?Sized> StyleApplier for Box<A> {
    fn apply(&mut self, m: &Match, style: &StyleDescriptor) {
        (**self).apply(m, style)
    }

    fn remove(&mut self, m: &Match) {
        (**self).remove(m)
    }
}

/// In-memory applier keyed by match identity.
///
/// Useful for headless hosts and as the simulated collaborator in tests.
#[derive(Debug, Default)]
pub struct MemoryApplier {
    annotations: HashMap<Match, StyleDescriptor>,
    apply_calls: usize,
    remove_calls: usize,
}

impl MemoryApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_styled(&self, m: &Match) -> bool {
        self.annotations.contains_key(m)
    }

    pub fn style_of(&self, m: &Match) -> Option<&StyleDescriptor> {
        self.annotations.get(m)
    }

    /// Live annotations ordered by start offset
    pub fn annotations(&self) -> Vec<&Match> {
        let mut live: Vec<&Match> = self.annotations.keys().collect();
        live.sort_by_key(|m| (m.start, m.end));
        live
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls
    }
}

impl StyleApplier for MemoryApplier {
    fn apply(&mut self, m: &Match, style: &StyleDescriptor) {
        self.apply_calls += 1;
        self.annotations.insert(m.clone(), style.clone());
    }

    fn remove(&mut self, m: &Match) {
        self.remove_calls += 1;
        self.annotations.remove(m);
    }
}

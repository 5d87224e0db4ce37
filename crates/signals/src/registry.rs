//! Signal registry.
//!
//! Maps signal names to pure evaluators. Flag rules in configuration refer to
//! signals by name and are resolved against a registry once, at startup.

use std::collections::HashMap;

use axiom_core::{SignalEvaluator, SignalKind};

use crate::catalog;

/// A named evaluator and the shape of what it returns.
#[derive(Clone)]
pub struct SignalDefinition {
    pub name: String,
    pub kind: SignalKind,
    /// Every category a categorical signal can return. Empty for boolean signals.
    pub categories: Vec<String>,
    pub description: String,
    pub evaluator: SignalEvaluator,
}

impl SignalDefinition {
    /// Returns true if `category` is one the signal can produce.
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl std::fmt::Debug for SignalDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

/// Registry of named signal evaluators.
#[derive(Clone, Default)]
pub struct SignalRegistry {
    signals: HashMap<String, SignalDefinition>,
}

impl SignalRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signals: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in signal.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        catalog::register_builtin(&mut registry);
        registry
    }

    /// Registers a boolean signal. Replaces any signal with the same name.
    pub fn register_flag(&mut self, name: &str, description: &str, evaluator: SignalEvaluator) {
        self.insert(SignalDefinition {
            name: name.to_string(),
            kind: SignalKind::Boolean,
            categories: Vec::new(),
            description: description.to_string(),
            evaluator,
        });
    }

    /// Registers a categorical signal with its possible categories.
    pub fn register_categorical(
        &mut self,
        name: &str,
        description: &str,
        categories: &[&str],
        evaluator: SignalEvaluator,
    ) {
        self.insert(SignalDefinition {
            name: name.to_string(),
            kind: SignalKind::Categorical,
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
            description: description.to_string(),
            evaluator,
        });
    }

    fn insert(&mut self, definition: SignalDefinition) {
        if self.signals.contains_key(&definition.name) {
            tracing::debug!(signal = %definition.name, "replacing registered signal");
        }
        self.signals.insert(definition.name.clone(), definition);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.signals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("signals", &self.names())
            .finish()
    }
}

//! Name -> step lookup.
//!
//! The registry is built once at startup and shared read-only by every
//! worker. Signatures are resolved through it at execution time, so a chain
//! is only data until the substrate runs it.

use std::collections::HashMap;

use super::{BoxStep, Step};

#[derive(Debug, Default, Clone)]
pub struct StepRegistry {
    steps: HashMap<String, BoxStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under its own name, replacing any previous entry.
    pub fn register<T: Step + 'static>(&mut self, step: T) -> &mut Self {
        let step = BoxStep::new(step);
        let name = step.name().to_string();
        if self.steps.insert(name.clone(), step).is_some() {
            tracing::warn!(step = name.as_str(), "replaced previously registered step");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&BoxStep> {
        self.steps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::arith::{AddStep, MultStep};

    #[test]
    fn register_and_lookup() {
        let mut registry = StepRegistry::new();
        registry.register(AddStep).register(MultStep);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("add"));
        assert_eq!(registry.get("mult").map(|s| s.name()), Some("mult"));
        assert!(registry.get("divide").is_none());
        assert_eq!(registry.names(), vec!["add", "mult"]);
    }

    #[test]
    fn re_registering_replaces() {
        let mut registry = StepRegistry::new();
        registry.register(AddStep).register(AddStep);
        assert_eq!(registry.len(), 1);
    }
}

//! Error types for the domain layer.

use thiserror::Error;

use crate::binding::BindingName;

/// General domain error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A binding name that is not part of the monitored vocabulary.
    #[error("Unknown binding: {0}")]
    UnknownBinding(String),
}

/// A monitored binding resolves to a live implementation while tests run.
///
/// Carries every offending binding so the test report names all of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("isolation violation: live implementation bound to {}", format_names(.bindings))]
pub struct IsolationViolation {
    bindings: Vec<BindingName>,
}

impl IsolationViolation {
    /// Returns `None` when there is nothing to report.
    pub fn from_bindings(bindings: Vec<BindingName>) -> Option<Self> {
        if bindings.is_empty() {
            None
        } else {
            Some(Self { bindings })
        }
    }

    pub fn bindings(&self) -> &[BindingName] {
        &self.bindings
    }

    /// Offending binding names as plain strings.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(BindingName::as_str)
    }

    pub fn contains(&self, name: BindingName) -> bool {
        self.bindings.contains(&name)
    }

    /// Merge two violations, keeping first-seen order and dropping duplicates.
    pub fn merge(mut self, other: IsolationViolation) -> Self {
        for name in other.bindings {
            if !self.bindings.contains(&name) {
                self.bindings.push(name);
            }
        }
        self
    }
}

fn format_names(bindings: &[BindingName]) -> String {
    bindings
        .iter()
        .map(BindingName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Check registration and policy membership.

use crate::check::Check;
use crate::checks;
use imagecert_types::ids;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("check {name} is registered more than once")]
    DuplicateCheck { name: String },
}

struct Entry {
    check: Box<dyn Check>,
    policies: Vec<String>,
}

#[derive(Default)]
pub struct CheckRegistryBuilder {
    entries: Vec<Entry>,
}

impl CheckRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` as a member of each of `policies`.
    pub fn register<C>(&mut self, check: C, policies: &[&str]) -> Result<&mut Self, RegistryError>
    where
        C: Check + 'static,
    {
        let name = check.name();
        if self.entries.iter().any(|e| e.check.name() == name) {
            return Err(RegistryError::DuplicateCheck {
                name: name.to_string(),
            });
        }
        self.entries.push(Entry {
            check: Box::new(check),
            policies: policies.iter().map(|p| p.to_string()).collect(),
        });
        Ok(self)
    }

    pub fn build(self) -> CheckRegistry {
        CheckRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable set of known checks, shared by reference with every engine.
pub struct CheckRegistry {
    entries: Vec<Entry>,
}

impl CheckRegistry {
    pub fn builder() -> CheckRegistryBuilder {
        CheckRegistryBuilder::new()
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Check> {
        self.entries
            .iter()
            .find(|e| e.check.name() == name)
            .map(|e| e.check.as_ref())
    }

    /// Member checks of `policy`, in registration order. Unknown policies are empty.
    pub fn list_by_policy(&self, policy: &str) -> Vec<&dyn Check> {
        self.entries
            .iter()
            .filter(|e| e.policies.iter().any(|p| p == policy))
            .map(|e| e.check.as_ref())
            .collect()
    }

    /// Check names belonging to `policy`, in registration order.
    pub fn policy_names(&self, policy: &str) -> Vec<String> {
        self.list_by_policy(policy)
            .into_iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn policies(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.policies.iter().map(String::as_str))
            .collect()
    }

    pub fn checks(&self) -> impl Iterator<Item = &dyn Check> {
        self.entries.iter().map(|e| e.check.as_ref())
    }

    /// Policies `name` belongs to.
    pub fn policies_of(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .find(|e| e.check.name() == name)
            .map(|e| e.policies.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// The registry shipped with the binary.
pub fn builtin_registry() -> Result<CheckRegistry, RegistryError> {
    let container = ids::POLICY_CONTAINER;
    let operator = ids::POLICY_OPERATOR;

    let mut builder = CheckRegistry::builder();
    builder
        .register(checks::HasLicense, &[container])?
        .register(checks::HasOsRelease, &[container])?
        .register(checks::ReferenceIsPinned, &[container, operator])?
        .register(checks::BundleHasManifests, &[operator])?
        .register(checks::BundleHasAnnotations, &[operator])?;
    Ok(builder.build())
}

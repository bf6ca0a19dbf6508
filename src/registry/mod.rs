//! # Package Registry
//!
//! The authoritative in-memory store of indexed packages.
//!
//! ## Invariants
//! - A package is only accepted once every dependency it names is present.
//! - A package is never removed while another registered package names it
//!   as a dependency.
//!
//! Both checks run under the write lock together with the mutation they
//! guard, so concurrent `index`/`remove` calls are applied one at a time.
//! `query` takes the read lock and never observes a half-applied change.
//!
//! Operations never fail; every outcome is a [`Status`].

use crate::core::package::Package;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};


/// Outcome of a registry operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Fail,
}

/// Operations the dispatcher needs from a package store
pub trait PackageIndex: Send + Sync {
    /// Add a package once all its dependencies are present.
    /// Re-indexing an existing name is a no-op returning [`Status::Ok`].
    fn index(&self, pkg: Package) -> Status;

    /// Remove a package nothing depends on. Removing an absent name is a no-op.
    fn remove(&self, name: &str) -> Status;

    /// [`Status::Ok`] if `name` is indexed
    fn query(&self, name: &str) -> Status;
}

/// Thread-safe dependency-aware package registry
#[derive(Debug, Default)]
pub struct Registry {
    packages: RwLock<HashMap<String, Package>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed packages
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the stored entry for `name`, as it was accepted
    pub fn get(&self, name: &str) -> Option<Package> {
        self.read().get(name).cloned()
    }

    /// Names of the packages that directly depend on `name`
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let packages = self.read();
        let mut names: Vec<String> = packages
            .values()
            .filter(|p| p.depends_on(name))
            .map(|p| p.name().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    // No code panics while holding either guard, so a poisoned lock still
    // protects a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Package>> {
        self.packages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Package>> {
        self.packages.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing_dependency<'a>(
        packages: &HashMap<String, Package>,
        pkg: &'a Package,
    ) -> Option<&'a str> {
        pkg.deps()
            .iter()
            .map(String::as_str)
            .find(|dep| !packages.contains_key(*dep))
    }

    fn first_dependent<'a>(packages: &'a HashMap<String, Package>, name: &str) -> Option<&'a str> {
        packages
            .values()
            .find(|p| p.depends_on(name))
            .map(Package::name)
    }
}

impl PackageIndex for Registry {
    #[instrument(skip(self, pkg), fields(package = %pkg.name()), level = "trace")]
    fn index(&self, pkg: Package) -> Status {
        let mut packages = self.write();

        if packages.contains_key(pkg.name()) {
            return Status::Ok;
        }

        if let Some(dep) = Self::missing_dependency(&packages, &pkg) {
            debug!(package = %pkg.name(), missing = %dep, "Dependency not indexed");
            return Status::Fail;
        }

        packages.insert(pkg.name().to_string(), pkg);
        Status::Ok
    }

    #[instrument(skip(self), level = "trace")]
    fn remove(&self, name: &str) -> Status {
        let mut packages = self.write();

        if !packages.contains_key(name) {
            return Status::Ok;
        }

        if let Some(dependent) = Self::first_dependent(&packages, name) {
            debug!(package = %name, dependent = %dependent, "Package still required");
            return Status::Fail;
        }

        packages.remove(name);
        Status::Ok
    }

    fn query(&self, name: &str) -> Status {
        if self.read().contains_key(name) {
            Status::Ok
        } else {
            Status::Fail
        }
    }
}

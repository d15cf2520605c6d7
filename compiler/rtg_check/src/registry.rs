//! Checker registry.
//!
//! An ordered, process-wide list of lookups. For each descriptor the engine
//! asks the lookups in order and runs the first checker returned. The
//! built-in lookup is registered first; lookups added later run only for
//! descriptors it declines, unless inserted ahead of it.
//!
//! Mutating the registry while checks run on other threads is allowed but
//! racy: a check uses the list as it was when its memo was created.

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rtg_types::{ClassRef, TypeDesc, Value};

use crate::checkers::BuiltinLookup;
use crate::errors::CheckError;
use crate::memo::TypeCheckMemo;

/// A built-in checking function.
pub type CheckFn = fn(&Value, &TypeDesc, &mut TypeCheckMemo) -> Result<(), CheckError>;

/// A checking closure supplied by a plugin.
pub type DynCheckFn =
    Arc<dyn Fn(&Value, &TypeDesc, &mut TypeCheckMemo) -> Result<(), CheckError> + Send + Sync>;

/// A checking function returned by a lookup.
#[derive(Clone)]
pub enum Checker {
    Native(CheckFn),
    Dynamic(DynCheckFn),
}

impl Checker {
    #[inline]
    pub fn check(
        &self,
        value: &Value,
        desc: &TypeDesc,
        memo: &mut TypeCheckMemo,
    ) -> Result<(), CheckError> {
        match self {
            Checker::Native(f) => f(value, desc, memo),
            Checker::Dynamic(f) => f(value, desc, memo),
        }
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checker::Native(_) => f.write_str("Checker::Native"),
            Checker::Dynamic(_) => f.write_str("Checker::Dynamic"),
        }
    }
}

/// Maps a descriptor (origin, parameters, extras) to a checker.
pub trait CheckerLookup: Send + Sync {
    /// Name used to remove the lookup again and in diagnostics.
    fn name(&self) -> &str;

    fn lookup(&self, desc: &TypeDesc) -> Option<Checker>;
}

/// Shared handle to a registered lookup.
pub type LookupRef = Arc<dyn CheckerLookup>;

struct FnLookup<F> {
    name: String,
    f: F,
}

impl<F> CheckerLookup for FnLookup<F>
where
    F: Fn(&TypeDesc) -> Option<Checker> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, desc: &TypeDesc) -> Option<Checker> {
        (self.f)(desc)
    }
}

/// A lookup from a closure.
pub fn lookup_fn<F>(name: &str, f: F) -> LookupRef
where
    F: Fn(&TypeDesc) -> Option<Checker> + Send + Sync + 'static,
{
    Arc::new(FnLookup {
        name: name.to_string(),
        f,
    })
}

fn builtin_lookups() -> Vec<LookupRef> {
    vec![Arc::new(BuiltinLookup)]
}

static LOOKUPS: LazyLock<RwLock<Vec<LookupRef>>> =
    LazyLock::new(|| RwLock::new(builtin_lookups()));

/// Snapshot of the registered lookups, in priority order.
pub fn checker_lookups() -> Vec<LookupRef> {
    LOOKUPS.read().clone()
}

/// Append a lookup after every registered one.
pub fn register_lookup(lookup: LookupRef) {
    tracing::debug!(name = lookup.name(), "registering checker lookup");
    LOOKUPS.write().push(lookup);
}

/// Insert a lookup at `index` (clamped), `0` being the highest priority.
pub fn register_lookup_at(index: usize, lookup: LookupRef) {
    tracing::debug!(name = lookup.name(), index, "inserting checker lookup");
    let mut lookups = LOOKUPS.write();
    let index = index.min(lookups.len());
    lookups.insert(index, lookup);
}

/// Remove every lookup named `name`. Returns whether any was removed.
pub fn remove_lookup(name: &str) -> bool {
    let mut lookups = LOOKUPS.write();
    let before = lookups.len();
    lookups.retain(|l| l.name() != name);
    lookups.len() != before
}

/// Restore the registry to just the built-in lookup.
pub fn reset_lookups() {
    *LOOKUPS.write() = builtin_lookups();
}

// Test doubles

static TEST_DOUBLES: LazyLock<RwLock<Vec<ClassRef>>> = LazyLock::new(|| RwLock::new(Vec::new()));

/// Register a class whose instances pass every check.
pub fn register_test_double(class: ClassRef) {
    let mut doubles = TEST_DOUBLES.write();
    if !doubles.contains(&class) {
        doubles.push(class);
    }
}

pub fn unregister_test_double(class: &ClassRef) {
    TEST_DOUBLES.write().retain(|c| c != class);
}

/// Whether `value` is an instance of a registered test-double class.
pub fn is_test_double(value: &Value) -> bool {
    let doubles = TEST_DOUBLES.read();
    if doubles.is_empty() {
        return false;
    }
    let class = value.class_of();
    doubles.iter().any(|d| class.is_subclass_of(d))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

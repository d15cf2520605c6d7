//! Process-wide checking configuration.
//!
//! One [`TypeCheckConfiguration`] record lives behind a lock. Every check
//! copies it into its resolution context when the check starts, so later
//! changes only affect checks started afterwards.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rtg_ir::{CollectionCheckStrategy, ForwardRefPolicy, PlanOverrides};
use rtg_types::TypeCheckError;

use crate::memo::TypeCheckMemo;

/// Environment variable that switches debug instrumentation on.
pub const DEBUG_INSTRUMENTATION_ENV: &str = "RTGUARD_DEBUG_INSTRUMENTATION";
/// Environment variable that selects optimized (no-checks) mode.
pub const OPTIMIZED_ENV: &str = "RTGUARD_OPTIMIZED";

/// Called instead of raising when a check fails.
pub type TypeCheckFailCallback = Arc<dyn Fn(&TypeCheckError, &TypeCheckMemo) + Send + Sync>;

/// Checking configuration.
#[derive(Clone)]
pub struct TypeCheckConfiguration {
    pub forward_ref_policy: ForwardRefPolicy,
    pub collection_check_strategy: CollectionCheckStrategy,
    /// Dump rewritten code to the diagnostics sink.
    pub debug_instrumentation: bool,
    pub typecheck_fail_callback: Option<TypeCheckFailCallback>,
    /// Totality of records that do not declare it.
    pub typed_record_default_total: bool,
}

impl Default for TypeCheckConfiguration {
    fn default() -> Self {
        TypeCheckConfiguration {
            forward_ref_policy: ForwardRefPolicy::Warn,
            collection_check_strategy: CollectionCheckStrategy::FirstItem,
            debug_instrumentation: false,
            typecheck_fail_callback: None,
            typed_record_default_total: true,
        }
    }
}

impl TypeCheckConfiguration {
    /// Defaults, with `debug_instrumentation` taken from the environment.
    pub fn from_env() -> Self {
        TypeCheckConfiguration {
            debug_instrumentation: env_flag(DEBUG_INSTRUMENTATION_ENV),
            ..TypeCheckConfiguration::default()
        }
    }

    /// This configuration with `overrides` applied.
    #[must_use]
    pub fn merged(&self, overrides: &ConfigOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(policy) = overrides.forward_ref_policy {
            merged.forward_ref_policy = policy;
        }
        if let Some(strategy) = overrides.collection_check_strategy {
            merged.collection_check_strategy = strategy;
        }
        if let Some(debug) = overrides.debug_instrumentation {
            merged.debug_instrumentation = debug;
        }
        if let Some(callback) = &overrides.typecheck_fail_callback {
            merged.typecheck_fail_callback = Some(Arc::clone(callback));
        }
        merged
    }

    /// This configuration with per-function overrides applied.
    #[must_use]
    pub fn with_plan(&self, overrides: PlanOverrides) -> Self {
        self.merged(&ConfigOverrides::from(overrides))
    }
}

impl fmt::Debug for TypeCheckConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCheckConfiguration")
            .field("forward_ref_policy", &self.forward_ref_policy)
            .field("collection_check_strategy", &self.collection_check_strategy)
            .field("debug_instrumentation", &self.debug_instrumentation)
            .field("typecheck_fail_callback", &self.typecheck_fail_callback.is_some())
            .field("typed_record_default_total", &self.typed_record_default_total)
            .finish()
    }
}

/// Optional overrides merged over a base configuration.
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    pub forward_ref_policy: Option<ForwardRefPolicy>,
    pub collection_check_strategy: Option<CollectionCheckStrategy>,
    pub debug_instrumentation: Option<bool>,
    pub typecheck_fail_callback: Option<TypeCheckFailCallback>,
}

impl ConfigOverrides {
    #[must_use]
    pub fn forward_ref_policy(mut self, policy: ForwardRefPolicy) -> Self {
        self.forward_ref_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn collection_check_strategy(mut self, strategy: CollectionCheckStrategy) -> Self {
        self.collection_check_strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn typecheck_fail_callback(mut self, callback: TypeCheckFailCallback) -> Self {
        self.typecheck_fail_callback = Some(callback);
        self
    }
}

impl From<PlanOverrides> for ConfigOverrides {
    fn from(plan: PlanOverrides) -> Self {
        ConfigOverrides {
            forward_ref_policy: plan.forward_ref_policy,
            collection_check_strategy: plan.collection_check_strategy,
            ..ConfigOverrides::default()
        }
    }
}

impl fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("forward_ref_policy", &self.forward_ref_policy)
            .field("collection_check_strategy", &self.collection_check_strategy)
            .field("debug_instrumentation", &self.debug_instrumentation)
            .field("typecheck_fail_callback", &self.typecheck_fail_callback.is_some())
            .finish()
    }
}

static GLOBAL_CONFIG: LazyLock<RwLock<TypeCheckConfiguration>> =
    LazyLock::new(|| RwLock::new(TypeCheckConfiguration::from_env()));

static OPTIMIZED: LazyLock<AtomicBool> = LazyLock::new(|| AtomicBool::new(env_flag(OPTIMIZED_ENV)));

fn env_flag(var: &str) -> bool {
    std::env::var_os(var).is_some_and(|v| !v.is_empty() && v != "0")
}

/// Snapshot of the process-wide configuration.
pub fn global_config() -> TypeCheckConfiguration {
    GLOBAL_CONFIG.read().clone()
}

/// Replace the process-wide configuration.
pub fn set_global_config(config: TypeCheckConfiguration) {
    tracing::debug!(?config, "replacing global type-check configuration");
    *GLOBAL_CONFIG.write() = config;
}

/// Mutate the process-wide configuration in place.
pub fn update_global_config(f: impl FnOnce(&mut TypeCheckConfiguration)) {
    f(&mut GLOBAL_CONFIG.write());
}

/// Whether the host runs in optimized mode, where per-function
/// instrumentation is skipped.
pub fn optimized_mode() -> bool {
    OPTIMIZED.load(Ordering::Relaxed)
}

pub fn set_optimized_mode(on: bool) {
    OPTIMIZED.store(on, Ordering::Relaxed);
}

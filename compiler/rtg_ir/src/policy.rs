//! Checking policies shared by the rewriter and the matching engine.
//!
//! Per-function overrides are parsed at rewrite time and baked into the
//! instrumented IR, so the policy enums live at the bottom of the crate graph.

use std::fmt;

/// How unresolvable deferred references are treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForwardRefPolicy {
    /// Fail the check.
    Error,
    /// Emit a diagnostic and accept the value.
    #[default]
    Warn,
    /// Silently accept the value.
    Ignore,
}

impl ForwardRefPolicy {
    /// Parse a policy from its member name (`ERROR`, `warn`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" => Some(Self::Warn),
            "IGNORE" => Some(Self::Ignore),
            _ => None,
        }
    }
}

impl fmt::Display for ForwardRefPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Ignore => "IGNORE",
        })
    }
}

/// How many elements of a collection are checked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionCheckStrategy {
    /// Only the first element (or first key/value pair).
    #[default]
    FirstItem,
    /// Every element.
    AllItems,
}

impl CollectionCheckStrategy {
    /// Parse a strategy from its member name (`FIRST_ITEM`, `all_items`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "FIRST_ITEM" => Some(Self::FirstItem),
            "ALL_ITEMS" => Some(Self::AllItems),
            _ => None,
        }
    }

    /// Number of leading elements to visit out of `len`.
    #[inline]
    pub fn sample_len(self, len: usize) -> usize {
        match self {
            Self::FirstItem => len.min(1),
            Self::AllItems => len,
        }
    }
}

impl fmt::Display for CollectionCheckStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstItem => "FIRST_ITEM",
            Self::AllItems => "ALL_ITEMS",
        })
    }
}

/// Per-function overrides captured by the rewriter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlanOverrides {
    pub collection_check_strategy: Option<CollectionCheckStrategy>,
    pub forward_ref_policy: Option<ForwardRefPolicy>,
}

impl PlanOverrides {
    /// Whether no override is set.
    pub fn is_empty(&self) -> bool {
        self.collection_check_strategy.is_none() && self.forward_ref_policy.is_none()
    }
}

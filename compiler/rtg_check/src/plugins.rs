//! Checker plugins.
//!
//! Plugin discovery belongs to the embedder. It lists entries as
//! `(name, module, attribute)` and resolves each to a lookup through a
//! [`PluginResolver`]; loaded plugins go ahead of every registered lookup.

use std::fmt;

use crate::diagnostics::{emit, Diagnostic};
use crate::registry::{register_lookup_at, LookupRef};

/// Environment variable that disables [`autoload_plugins`].
pub const DISABLE_PLUGIN_AUTOLOAD_ENV: &str = "RTGUARD_DISABLE_PLUGIN_AUTOLOAD";

/// One advertised plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginEntry {
    pub name: String,
    pub module: String,
    pub attribute: String,
}

impl PluginEntry {
    pub fn new(name: &str, module: &str, attribute: &str) -> Self {
        PluginEntry {
            name: name.to_string(),
            module: module.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl fmt::Display for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}:{}", self.name, self.module, self.attribute)
    }
}

/// What a plugin entry resolved to.
pub enum PluginTarget {
    Lookup(LookupRef),
    /// The entry named something that cannot act as a lookup.
    NotCallable { type_name: String },
}

/// Finds and loads advertised plugins.
pub trait PluginResolver {
    fn entries(&self) -> Vec<PluginEntry>;

    fn resolve(&self, entry: &PluginEntry) -> Result<PluginTarget, String>;
}

/// Load every plugin the resolver advertises. Failures are reported as
/// diagnostics and skipped. Returns the number of plugins registered.
#[tracing::instrument(level = "debug", skip_all)]
pub fn load_plugins(resolver: &dyn PluginResolver) -> usize {
    let mut loaded = 0;
    for entry in resolver.entries() {
        match resolver.resolve(&entry) {
            Ok(PluginTarget::Lookup(lookup)) => {
                tracing::debug!(plugin = %entry, "loaded checker plugin");
                register_lookup_at(0, lookup);
                loaded += 1;
            }
            Ok(PluginTarget::NotCallable { type_name }) => emit(&Diagnostic::Plugin {
                name: entry.name.clone(),
                message: format!("{entry} returned a non-callable object: {type_name}"),
            }),
            Err(message) => emit(&Diagnostic::Plugin {
                name: entry.name.clone(),
                message,
            }),
        }
    }
    loaded
}

/// [`load_plugins`], unless disabled through the environment.
pub fn autoload_plugins(resolver: &dyn PluginResolver) -> usize {
    if std::env::var_os(DISABLE_PLUGIN_AUTOLOAD_ENV).is_some() {
        tracing::debug!("plugin autoload disabled");
        return 0;
    }
    load_plugins(resolver)
}

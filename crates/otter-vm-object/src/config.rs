//! Object model tuning knobs.

use serde::Deserialize;

/// Object model configuration
///
/// Deserializable so it can be embedded as a section of `otter.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectModelConfig {
    /// Allow user objects to switch to dictionary mode
    #[serde(default = "default_true")]
    pub dictionary_objects: bool,

    /// Shape-backed property count at which a user object switches to
    /// dictionary mode on its next property addition
    #[serde(default = "default_threshold")]
    pub dictionary_transition_threshold: usize,

    /// Return the shape's key order directly when it is already in
    /// enumeration order
    #[serde(default = "default_true")]
    pub fast_own_keys: bool,

    /// Nesting limit for proxy dispatch on one thread. A prototype chain
    /// that closes through a proxy fails with a `RangeError` at this depth.
    #[serde(default = "default_max_proxy_depth")]
    pub max_proxy_depth: usize,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> usize {
    32
}

fn default_max_proxy_depth() -> usize {
    256
}

impl Default for ObjectModelConfig {
    fn default() -> Self {
        Self {
            dictionary_objects: true,
            dictionary_transition_threshold: default_threshold(),
            fast_own_keys: true,
            max_proxy_depth: default_max_proxy_depth(),
        }
    }
}

impl ObjectModelConfig {
    /// Defaults overridden by `OTTER_DICTIONARY_OBJECTS`,
    /// `OTTER_DICTIONARY_THRESHOLD`, `OTTER_FAST_OWN_KEYS` and
    /// `OTTER_MAX_PROXY_DEPTH`.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(flag) = lookup("OTTER_DICTIONARY_OBJECTS").and_then(|v| parse_flag(&v)) {
            config.dictionary_objects = flag;
        }
        if let Some(threshold) =
            lookup("OTTER_DICTIONARY_THRESHOLD").and_then(|v| v.trim().parse().ok())
        {
            config.dictionary_transition_threshold = threshold;
        }
        if let Some(flag) = lookup("OTTER_FAST_OWN_KEYS").and_then(|v| parse_flag(&v)) {
            config.fast_own_keys = flag;
        }
        if let Some(depth) = lookup("OTTER_MAX_PROXY_DEPTH").and_then(|v| v.trim().parse().ok()) {
            config.max_proxy_depth = depth;
        }
        config
    }

    /// Set the dictionary transition threshold
    pub fn with_dictionary_threshold(mut self, threshold: usize) -> Self {
        self.dictionary_transition_threshold = threshold;
        self
    }

    /// Enable or disable dictionary mode
    pub fn with_dictionary_objects(mut self, enabled: bool) -> Self {
        self.dictionary_objects = enabled;
        self
    }

    /// Set the proxy dispatch nesting limit
    pub fn with_max_proxy_depth(mut self, depth: usize) -> Self {
        self.max_proxy_depth = depth;
        self
    }

    /// Enable or disable the own-keys fast path
    pub fn with_fast_own_keys(mut self, enabled: bool) -> Self {
        self.fast_own_keys = enabled;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

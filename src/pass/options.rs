//! Options shared by every pass in a run.

use crate::errors::PassError;
use std::collections::BTreeMap;

/// Addresses below this bound are assumed unused when
/// `low_memory_unused` is set.
pub const LOW_MEMORY_BOUND: u64 = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InliningOptions {
    /// Functions this size or smaller are always inlined.
    pub always_inline_max_size: u32,
    /// Functions this size or smaller may be inlined when doing so
    /// looks profitable.
    pub flexible_inline_max_size: u32,
    /// Functions with a single caller are inlined up to this size.
    pub one_caller_inline_max_size: u32,
}

impl Default for InliningOptions {
    fn default() -> Self {
        InliningOptions {
            always_inline_max_size: 2,
            flexible_inline_max_size: 20,
            one_caller_inline_max_size: 15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOptions {
    /// Step through passes one at a time, validating after each.
    pub debug: bool,
    /// Validate after each pass when debugging.
    pub validate: bool,
    /// Include module-level checks when validating.
    pub validate_globally: bool,
    pub optimize_level: u32,
    pub shrink_level: u32,
    pub inlining: InliningOptions,
    /// Assume loads and arithmetic never trap.
    pub ignore_implicit_traps: bool,
    /// Assume addresses below [`LOW_MEMORY_BOUND`] are never accessed.
    pub low_memory_unused: bool,
    /// Preserve debug info where possible.
    pub debug_info: bool,
    /// Free-form string arguments for individual passes.
    pub arguments: BTreeMap<String, String>,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            debug: false,
            validate: true,
            validate_globally: false,
            optimize_level: 0,
            shrink_level: 0,
            inlining: InliningOptions::default(),
            ignore_implicit_traps: false,
            low_memory_unused: false,
            debug_info: false,
            arguments: BTreeMap::new(),
        }
    }
}

impl PassOptions {
    /// Options for the default optimizing pipeline, as for `-Os`.
    pub fn with_default_optimization_options() -> Self {
        PassOptions {
            optimize_level: 2,
            shrink_level: 1,
            ..PassOptions::default()
        }
    }

    pub fn without_optimization() -> Self {
        PassOptions::default()
    }

    /// A required pass argument. `error_text` explains what the pass
    /// needs the argument for.
    pub fn get_argument(&self, key: &str, error_text: &str) -> Result<&str, PassError> {
        self.arguments
            .get(key)
            .map(|value| &value[..])
            .ok_or_else(|| PassError::MissingArgument {
                key: key.to_owned(),
                message: error_text.to_owned(),
            })
    }

    pub fn get_argument_or_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.arguments
            .get(key)
            .map(|value| &value[..])
            .unwrap_or(default)
    }

    pub fn set_argument(&mut self, key: &str, value: &str) {
        self.arguments.insert(key.to_owned(), value.to_owned());
    }
}

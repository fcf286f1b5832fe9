//! Pass debugging: stepping through a pipeline one pass at a time.

use crate::ir::Module;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

/// Environment variable that selects the debug level of every
/// top-level runner in the process.
pub const PASS_DEBUG_ENV: &str = "WASM_PASS_DEBUG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off,
    /// Time each pass and validate after it.
    Validate,
    /// Also keep the last valid module to compare against on failure.
    Snapshot,
    /// Also write the module text to a file after every pass.
    Dump,
}

impl DebugLevel {
    pub fn from_u32(level: u32) -> DebugLevel {
        match level {
            0 => DebugLevel::Off,
            1 => DebugLevel::Validate,
            2 => DebugLevel::Snapshot,
            _ => DebugLevel::Dump,
        }
    }

    pub fn is_on(self) -> bool {
        self != DebugLevel::Off
    }
}

impl Default for DebugLevel {
    fn default() -> Self {
        DebugLevel::Off
    }
}

lazy_static! {
    static ref ENV_LEVEL: DebugLevel = std::env::var(PASS_DEBUG_ENV)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .map(DebugLevel::from_u32)
        .unwrap_or_default();
}

/// The level requested through the environment, read once.
pub fn pass_debug_level() -> DebugLevel {
    *ENV_LEVEL
}

/// The last module state known to validate.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    last_good: Option<(String, Module)>,
}

impl Snapshot {
    pub fn new() -> Snapshot {
        Snapshot::default()
    }

    /// Remember `module` as valid after `pass` ran.
    pub fn record(&mut self, pass: &str, module: &Module) {
        self.last_good = Some((pass.to_owned(), module.clone()));
    }

    /// The pass after which the snapshot was taken, and the module.
    pub fn last_good(&self) -> Option<(&str, &Module)> {
        self.last_good
            .as_ref()
            .map(|(pass, module)| (&pass[..], module))
    }

    /// The first line at which `module`'s text differs from the
    /// snapshot, with the old and new line contents.
    pub fn first_divergence(&self, module: &Module) -> Option<(usize, String, String)> {
        let (_, good) = self.last_good()?;
        first_divergent_line(
            &format!("{}", good.display()),
            &format!("{}", module.display()),
        )
    }
}

fn first_divergent_line(old: &str, new: &str) -> Option<(usize, String, String)> {
    let mut old_lines = old.lines();
    let mut new_lines = new.lines();
    let mut line = 1;
    loop {
        match (old_lines.next(), new_lines.next()) {
            (None, None) => return None,
            (a, b) if a == b => {}
            (a, b) => {
                return Some((
                    line,
                    a.unwrap_or("<end>").to_owned(),
                    b.unwrap_or("<end>").to_owned(),
                ))
            }
        }
        line += 1;
    }
}

/// Path of the dump file written after pass number `index`.
pub fn dump_path(dir: &Path, index: usize, pass: &str) -> PathBuf {
    dir.join(format!("pass-debug-{:03}-{}.txt", index, pass))
}

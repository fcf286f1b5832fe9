//! Error types.

use crate::ir::Func;

/// An error raised by the pass engine itself (as opposed to errors
/// raised inside individual passes, which are propagated untouched).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassError {
    /// A pass name was not found in the catalog. This is a
    /// configuration error: the pipeline cannot be built.
    UnknownPass(String),
    /// A pass requires a string argument that was not supplied.
    MissingArgument { key: String, message: String },
    /// A pass left the module in an invalid state (debug mode only).
    ValidationFailed { pass: String, message: String },
    /// A per-function run was requested for an imported function.
    NoFunctionBody(Func),
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PassError::UnknownPass(name) => write!(f, "Could not find pass: {}", name),
            PassError::MissingArgument { key, message } => {
                write!(f, "missing pass argument '{}': {}", key, message)
            }
            PassError::ValidationFailed { pass, message } => {
                write!(f, "Last pass ({}) broke validation: {}", pass, message)
            }
            PassError::NoFunctionBody(func) => write!(f, "{} has no body to run passes on", func),
        }
    }
}

impl std::error::Error for PassError {}

/// A structural problem found by the validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// The function the problem was found in, if it is local to one.
    pub func: Option<Func>,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn module(message: impl Into<String>) -> Self {
        ValidationError {
            func: None,
            message: message.into(),
        }
    }

    pub(crate) fn in_func(func: Func, message: impl Into<String>) -> Self {
        ValidationError {
            func: Some(func),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.func {
            Some(func) => write!(f, "in {}: {}", func, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

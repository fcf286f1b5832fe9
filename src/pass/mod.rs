//! Pass framework: the pass abstraction, the catalog passes are
//! created from, and the runner that schedules them over a module.
//!
//! A pass either transforms the IR or only reads it (an analysis).
//! Module passes see the whole module at once; function passes see one
//! function body at a time and may be run on many functions in
//! parallel.

use crate::ir::{Func, FunctionBody, Module};
use anyhow::Result;
use std::any::Any;

pub mod dataflow;
pub use dataflow::*;
pub mod debug;
pub mod lattice;
pub use lattice::*;
pub mod options;
pub use options::*;
pub mod registry;
pub use registry::*;
pub mod runner;
pub use runner::*;

/// Access to a pass as its concrete type, for reading results back
/// out of a runner. Implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A pass that operates on the module as a whole.
pub trait ModulePass: AsAny + Send {
    /// Called once before `run`, with the module in its pre-pass state.
    fn prepare_to_run(&mut self, _options: &PassOptions, _module: &Module) {}

    fn run(&mut self, options: &PassOptions, module: &mut Module) -> Result<()>;

    /// Whether this pass may change the IR. Derived forms are
    /// invalidated after passes that return `true`.
    fn modifies_ir(&self) -> bool {
        true
    }
}

/// A pass that operates on one function body at a time.
///
/// While it runs, the body is detached from `module`; the module's
/// other function bodies must not be relied upon.
pub trait FunctionPass: AsAny + Send {
    fn prepare_to_run(&mut self, _options: &PassOptions, _module: &Module) {}

    fn run_on_function(
        &mut self,
        options: &PassOptions,
        module: &Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> Result<()>;

    /// A fresh instance of this pass, used to give each function its
    /// own copy when running in parallel.
    fn create(&self) -> Box<dyn FunctionPass>;

    /// Whether instances may run on different functions concurrently.
    fn is_function_parallel(&self) -> bool {
        false
    }

    fn modifies_ir(&self) -> bool {
        true
    }
}

pub enum PassKind {
    Module(Box<dyn ModulePass>),
    Function(Box<dyn FunctionPass>),
}

/// A named pass instance.
pub struct Pass {
    name: String,
    pub kind: PassKind,
}

impl Pass {
    pub fn new(name: &str, kind: PassKind) -> Pass {
        Pass {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn module<P: ModulePass + 'static>(name: &str, pass: P) -> Pass {
        Pass::new(name, PassKind::Module(Box::new(pass)))
    }

    pub fn function<P: FunctionPass + 'static>(name: &str, pass: P) -> Pass {
        Pass::new(name, PassKind::Function(Box::new(pass)))
    }

    pub fn name(&self) -> &str {
        &self.name[..]
    }

    pub fn is_function_parallel(&self) -> bool {
        match &self.kind {
            PassKind::Module(_) => false,
            PassKind::Function(pass) => pass.is_function_parallel(),
        }
    }

    pub fn modifies_ir(&self) -> bool {
        match &self.kind {
            PassKind::Module(pass) => pass.modifies_ir(),
            PassKind::Function(pass) => pass.modifies_ir(),
        }
    }

    /// The pass as `P`, if that is its concrete type.
    pub fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        let any = match &self.kind {
            PassKind::Module(pass) => AsAny::as_any(&**pass),
            PassKind::Function(pass) => AsAny::as_any(&**pass),
        };
        any.downcast_ref::<P>()
    }

    pub fn prepare_to_run(&mut self, options: &PassOptions, module: &Module) {
        match &mut self.kind {
            PassKind::Module(pass) => pass.prepare_to_run(options, module),
            PassKind::Function(pass) => pass.prepare_to_run(options, module),
        }
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let kind = match self.kind {
            PassKind::Module(_) => "module",
            PassKind::Function(_) => "function",
        };
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("parallel", &self.is_function_parallel())
            .field("modifies_ir", &self.modifies_ir())
            .finish()
    }
}

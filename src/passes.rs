//! Passes.

use crate::pass::{Catalog, PassKind};

pub mod precompute;
pub mod print;
pub mod propagate_globals;
pub mod stack_ir;
pub mod taint;
pub mod vacuum;

/// Register every built-in pass.
pub fn register_all(catalog: &mut Catalog) {
    catalog.register(
        "generate-stack-ir",
        "generate stack IR for each function",
        || PassKind::Function(Box::new(stack_ir::GenerateStackIr)),
    );
    catalog.register("precompute", "computes compile-time evaluatable expressions", || {
        PassKind::Function(Box::new(precompute::Precompute))
    });
    catalog.register("print", "print the module as text", || {
        PassKind::Module(Box::new(print::Print))
    });
    catalog.register(
        "propagate-globals",
        "replaces reads of immutable globals with their values",
        || PassKind::Module(Box::new(propagate_globals::PropagateGlobals)),
    );
    catalog.register(
        "taint",
        "intraprocedural taint analysis of the start function",
        || PassKind::Module(Box::new(taint::Taint::default())),
    );
    catalog.register("vacuum", "removes obviously unneeded code", || {
        PassKind::Function(Box::new(vacuum::Vacuum))
    });
}

//! Pass to replace reads of immutable globals with their values.

use crate::ir::walk::{walk_mut, Mutator};
use crate::ir::*;
use crate::pass::{ModulePass, PassOptions};
use fxhash::FxHashMap;

struct Propagator<'a> {
    constants: &'a FxHashMap<Global, Literal>,
    replaced: usize,
}

impl<'a> Mutator for Propagator<'a> {
    fn visit_expr(&mut self, body: &mut FunctionBody, expr: Expr) {
        if let ExprData::GlobalGet(get) = &body[expr] {
            if let Some(&value) = self.constants.get(&get.global) {
                body.replace(expr, ExprData::Const(value));
                self.replaced += 1;
            }
        }
    }
}

/// Turns every `global.get` of an immutable global into a constant, so
/// that later function passes can fold it.
#[derive(Clone, Debug, Default)]
pub struct PropagateGlobals;

impl ModulePass for PropagateGlobals {
    fn run(&mut self, _options: &PassOptions, module: &mut Module) -> anyhow::Result<()> {
        let constants: FxHashMap<Global, Literal> = module
            .globals
            .entries()
            .filter(|(_, data)| !data.mutable)
            .map(|(global, data)| (global, data.init))
            .collect();
        if constants.is_empty() {
            return Ok(());
        }

        let mut propagator = Propagator {
            constants: &constants,
            replaced: 0,
        };
        module.per_func_body(|body| walk_mut(&mut propagator, body));
        log::debug!(
            "propagate-globals: {} reads of {} immutable globals replaced",
            propagator.replaced,
            constants.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn immutable_reads_become_constants() {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![], vec![]);
        let fixed = module.add_global("fixed", Type::I32, false);
        module.globals[fixed].init = Literal::I32(42);
        let counter = module.add_global("counter", Type::I32, true);

        let mut body = FunctionBody::new(&module, sig);
        let read_fixed = body.global_get(fixed);
        let drop_fixed = body.drop_(read_fixed);
        let read_counter = body.global_get(counter);
        let drop_counter = body.drop_(read_counter);
        let root = body.block(None, vec![drop_fixed, drop_counter]);
        body.set_root(root);
        let f = module.add_func("f", sig, body);

        PropagateGlobals
            .run(&PassOptions::default(), &mut module)
            .unwrap();
        let body = module.funcs[f].body().unwrap();
        assert_eq!(body[read_fixed], ExprData::Const(Literal::I32(42)));
        assert!(matches!(body[read_counter], ExprData::GlobalGet(_)));
    }
}

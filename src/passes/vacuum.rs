//! Pass to remove code that does nothing.

use crate::ir::walk::{walk_mut, Mutator};
use crate::ir::*;
use crate::pass::{FunctionPass, PassOptions};

/// Whether evaluating `expr` has no effect other than producing a
/// value.
fn is_pure_leaf(body: &FunctionBody, expr: Expr) -> bool {
    matches!(
        body[expr],
        ExprData::Const(_) | ExprData::LocalGet(_) | ExprData::Nop
    )
}

#[derive(Debug, Default)]
struct Cleaner {
    removed: usize,
}

impl Mutator for Cleaner {
    fn visit_expr(&mut self, body: &mut FunctionBody, expr: Expr) {
        match &body[expr] {
            ExprData::Drop(d) if is_pure_leaf(body, d.value) => {
                body.replace(expr, ExprData::Nop);
                self.removed += 1;
            }
            ExprData::Block(b) if b.children.iter().any(|&c| body[c] == ExprData::Nop) => {
                let mut block = b.clone();
                let before = block.children.len();
                block.children.retain(|&c| body[c] != ExprData::Nop);
                self.removed += before - block.children.len();
                body.replace(expr, ExprData::Block(block));
            }
            _ => {}
        }
    }
}

/// Removes `nop`s from blocks and `drop`s of values computed without
/// side effects.
#[derive(Clone, Debug, Default)]
pub struct Vacuum;

impl FunctionPass for Vacuum {
    fn run_on_function(
        &mut self,
        _options: &PassOptions,
        _module: &Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> anyhow::Result<()> {
        let mut cleaner = Cleaner::default();
        walk_mut(&mut cleaner, body);
        log::debug!("vacuum: removed {} expressions in {}", cleaner.removed, func);
        Ok(())
    }

    fn create(&self) -> Box<dyn FunctionPass> {
        Box::new(Vacuum)
    }

    fn is_function_parallel(&self) -> bool {
        true
    }
}

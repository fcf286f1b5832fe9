//! Pass that builds the stack IR of each function.

use crate::ir::*;
use crate::pass::{FunctionPass, PassOptions};

#[derive(Clone, Debug, Default)]
pub struct GenerateStackIr;

impl FunctionPass for GenerateStackIr {
    fn run_on_function(
        &mut self,
        _options: &PassOptions,
        _module: &Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> anyhow::Result<()> {
        let stack_ir = StackIr::generate(body);
        log::trace!("generate-stack-ir: {} has {} instructions", func, stack_ir.len());
        body.stack_ir = Some(stack_ir);
        Ok(())
    }

    fn create(&self) -> Box<dyn FunctionPass> {
        Box::new(GenerateStackIr)
    }

    fn is_function_parallel(&self) -> bool {
        true
    }

    // Only the derived form is written; the tree is untouched.
    fn modifies_ir(&self) -> bool {
        false
    }
}

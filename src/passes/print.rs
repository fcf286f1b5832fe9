//! Pass that prints the module as text.

use crate::ir::Module;
use crate::pass::{ModulePass, PassOptions};

#[derive(Clone, Debug, Default)]
pub struct Print;

impl ModulePass for Print {
    fn run(&mut self, _options: &PassOptions, module: &mut Module) -> anyhow::Result<()> {
        println!("{}", module.display());
        Ok(())
    }

    fn modifies_ir(&self) -> bool {
        false
    }
}

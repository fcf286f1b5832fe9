//! Stack IR: a linear, instruction-ordered form derived from a
//! function's expression tree.
//!
//! Stack IR is a cache. Any change to the tree makes it stale, and the
//! pass runner drops it (see [`FunctionBody::invalidate`]) after every
//! pass that may have changed the tree.

use super::{Expr, ExprData, FunctionBody};
use crate::entity::EntityRef;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackInst {
    /// Opens a structured construct (`block`, `loop`, `if`).
    Begin(Expr),
    /// Separates the arms of an `if`.
    Else(Expr),
    /// Closes the construct opened by the matching `Begin`.
    End(Expr),
    /// Any other instruction, emitted after its operands.
    Basic(Expr),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackIr {
    pub insts: Vec<StackInst>,
}

#[derive(Clone, Copy, Debug)]
enum Task {
    Emit(Expr),
    Inst(StackInst),
}

impl StackIr {
    pub fn generate(body: &FunctionBody) -> StackIr {
        let mut insts = vec![];
        if body.root.is_invalid() {
            return StackIr { insts };
        }
        let mut tasks: SmallVec<[Task; 64]> = SmallVec::new();
        tasks.push(Task::Emit(body.root));
        while let Some(task) = tasks.pop() {
            let expr = match task {
                Task::Inst(inst) => {
                    insts.push(inst);
                    continue;
                }
                Task::Emit(expr) => expr,
            };
            // Tasks are pushed in reverse of the order they run.
            match &body[expr] {
                ExprData::Block(block) => {
                    tasks.push(Task::Inst(StackInst::End(expr)));
                    for &child in block.children.iter().rev() {
                        tasks.push(Task::Emit(child));
                    }
                    tasks.push(Task::Inst(StackInst::Begin(expr)));
                }
                ExprData::Loop(l) => {
                    tasks.push(Task::Inst(StackInst::End(expr)));
                    tasks.push(Task::Emit(l.body));
                    tasks.push(Task::Inst(StackInst::Begin(expr)));
                }
                ExprData::If(i) => {
                    tasks.push(Task::Inst(StackInst::End(expr)));
                    if let Some(if_false) = i.if_false {
                        tasks.push(Task::Emit(if_false));
                        tasks.push(Task::Inst(StackInst::Else(expr)));
                    }
                    tasks.push(Task::Emit(i.if_true));
                    tasks.push(Task::Inst(StackInst::Begin(expr)));
                    tasks.push(Task::Emit(i.condition));
                }
                data => {
                    tasks.push(Task::Inst(StackInst::Basic(expr)));
                    for child in data.children().into_iter().rev() {
                        tasks.push(Task::Emit(child));
                    }
                }
            }
        }
        StackIr { insts }
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Module;

    #[test]
    fn structured_constructs_bracket_their_bodies() {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![], vec![]);
        let mut body = FunctionBody::new(&module, sig);
        let cond = body.i32_const(1);
        let a = body.nop();
        let b = body.unreachable();
        let iff = body.if_(cond, a, Some(b));
        let root = body.block(None, vec![iff]);
        body.set_root(root);

        let stack = StackIr::generate(&body);
        assert_eq!(
            stack.insts,
            vec![
                StackInst::Begin(root),
                StackInst::Basic(cond),
                StackInst::Begin(iff),
                StackInst::Basic(a),
                StackInst::Else(iff),
                StackInst::Basic(b),
                StackInst::End(iff),
                StackInst::End(root),
            ]
        );
    }

    #[test]
    fn empty_body_has_empty_stack_ir() {
        assert!(StackIr::generate(&FunctionBody::default()).is_empty());
    }
}

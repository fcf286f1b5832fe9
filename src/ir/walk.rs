//! Traversal of expression trees.
//!
//! A walk visits every node reachable from a root exactly once, in
//! post-order: all operands (in evaluation order) before the node
//! itself. The walk uses an explicit stack, so deeply nested bodies do
//! not grow the native stack.

use super::*;
use crate::entity::EntityRef;
use smallvec::SmallVec;

/// Typed per-node hooks. Every hook defaults to doing nothing;
/// implementors override the kinds they care about.
///
/// `visit_expr` is the dispatcher and is what the walkers call. It can
/// be overridden to see every node regardless of kind.
pub trait Visitor {
    fn visit_expr(&mut self, body: &FunctionBody, expr: Expr) {
        match &body[expr] {
            ExprData::Block(curr) => self.visit_block(expr, curr),
            ExprData::If(curr) => self.visit_if(expr, curr),
            ExprData::Loop(curr) => self.visit_loop(expr, curr),
            ExprData::Break(curr) => self.visit_break(expr, curr),
            ExprData::Switch(curr) => self.visit_switch(expr, curr),
            ExprData::Call(curr) => self.visit_call(expr, curr),
            ExprData::CallIndirect(curr) => self.visit_call_indirect(expr, curr),
            ExprData::LocalGet(curr) => self.visit_local_get(expr, curr),
            ExprData::LocalSet(curr) => self.visit_local_set(expr, curr),
            ExprData::GlobalGet(curr) => self.visit_global_get(expr, curr),
            ExprData::GlobalSet(curr) => self.visit_global_set(expr, curr),
            ExprData::Load(curr) => self.visit_load(expr, curr),
            ExprData::Store(curr) => self.visit_store(expr, curr),
            ExprData::Const(value) => self.visit_const(expr, *value),
            ExprData::Unary(curr) => self.visit_unary(expr, curr),
            ExprData::Binary(curr) => self.visit_binary(expr, curr),
            ExprData::Select(curr) => self.visit_select(expr, curr),
            ExprData::Drop(curr) => self.visit_drop(expr, curr),
            ExprData::Return(curr) => self.visit_return(expr, curr),
            ExprData::Nop => self.visit_nop(expr),
            ExprData::Unreachable => self.visit_unreachable(expr),
        }
    }

    fn visit_block(&mut self, _expr: Expr, _curr: &Block) {}
    fn visit_if(&mut self, _expr: Expr, _curr: &If) {}
    fn visit_loop(&mut self, _expr: Expr, _curr: &Loop) {}
    fn visit_break(&mut self, _expr: Expr, _curr: &Break) {}
    fn visit_switch(&mut self, _expr: Expr, _curr: &Switch) {}
    fn visit_call(&mut self, _expr: Expr, _curr: &Call) {}
    fn visit_call_indirect(&mut self, _expr: Expr, _curr: &CallIndirect) {}
    fn visit_local_get(&mut self, _expr: Expr, _curr: &LocalGet) {}
    fn visit_local_set(&mut self, _expr: Expr, _curr: &LocalSet) {}
    fn visit_global_get(&mut self, _expr: Expr, _curr: &GlobalGet) {}
    fn visit_global_set(&mut self, _expr: Expr, _curr: &GlobalSet) {}
    fn visit_load(&mut self, _expr: Expr, _curr: &Load) {}
    fn visit_store(&mut self, _expr: Expr, _curr: &Store) {}
    fn visit_const(&mut self, _expr: Expr, _value: Literal) {}
    fn visit_unary(&mut self, _expr: Expr, _curr: &Unary) {}
    fn visit_binary(&mut self, _expr: Expr, _curr: &Binary) {}
    fn visit_select(&mut self, _expr: Expr, _curr: &Select) {}
    fn visit_drop(&mut self, _expr: Expr, _curr: &DropValue) {}
    fn visit_return(&mut self, _expr: Expr, _curr: &Return) {}
    fn visit_nop(&mut self, _expr: Expr) {}
    fn visit_unreachable(&mut self, _expr: Expr) {}
}

/// A hook that may rewrite the node it is handed. Operands have
/// already been visited (and possibly rewritten) when it runs.
pub trait Mutator {
    fn visit_expr(&mut self, body: &mut FunctionBody, expr: Expr);
}

#[derive(Debug)]
struct Frame {
    expr: Expr,
    children: SmallVec<[Expr; 4]>,
    next_child: usize,
}

impl Frame {
    fn new(body: &FunctionBody, expr: Expr) -> Frame {
        Frame {
            expr,
            children: body[expr].children(),
            next_child: 0,
        }
    }
}

/// Post-order sequence of the nodes under `root`.
pub fn post_order(body: &FunctionBody, root: Expr) -> Vec<Expr> {
    let mut ret = vec![];
    if root.is_invalid() {
        return ret;
    }
    let mut stack: SmallVec<[Frame; 32]> = SmallVec::new();
    stack.push(Frame::new(body, root));
    while let Some(frame) = stack.last_mut() {
        if frame.next_child < frame.children.len() {
            let child = frame.children[frame.next_child];
            frame.next_child += 1;
            stack.push(Frame::new(body, child));
        } else {
            ret.push(frame.expr);
            stack.pop();
        }
    }
    ret
}

/// Walk the whole body, calling `visitor` on each node in post-order.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, body: &FunctionBody) {
    walk_expr(visitor, body, body.root);
}

/// Walk the subtree under `root`.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, body: &FunctionBody, root: Expr) {
    if root.is_invalid() {
        return;
    }
    let mut stack: SmallVec<[Frame; 32]> = SmallVec::new();
    stack.push(Frame::new(body, root));
    while let Some(frame) = stack.last_mut() {
        if frame.next_child < frame.children.len() {
            let child = frame.children[frame.next_child];
            frame.next_child += 1;
            stack.push(Frame::new(body, child));
        } else {
            let expr = frame.expr;
            stack.pop();
            visitor.visit_expr(body, expr);
        }
    }
}

/// Walk the whole body, letting `mutator` rewrite each node after its
/// operands. A node's operand list is captured when the node is
/// entered, so a rewrite only affects nodes not yet reached through
/// their parent's new data.
pub fn walk_mut<M: Mutator + ?Sized>(mutator: &mut M, body: &mut FunctionBody) {
    let root = body.root;
    if root.is_invalid() {
        return;
    }
    let mut stack: SmallVec<[Frame; 32]> = SmallVec::new();
    stack.push(Frame::new(body, root));
    while let Some(frame) = stack.last_mut() {
        if frame.next_child < frame.children.len() {
            let child = frame.children[frame.next_child];
            frame.next_child += 1;
            let frame = Frame::new(body, child);
            stack.push(frame);
        } else {
            let expr = frame.expr;
            stack.pop();
            mutator.visit_expr(body, expr);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Kinds(Vec<&'static str>);

    impl Visitor for Kinds {
        fn visit_expr(&mut self, body: &FunctionBody, expr: Expr) {
            self.0.push(body[expr].kind_name());
        }
    }

    #[derive(Default)]
    struct Gets(Vec<Local>);

    impl Visitor for Gets {
        fn visit_local_get(&mut self, _expr: Expr, curr: &LocalGet) {
            self.0.push(curr.local);
        }
    }

    fn sample() -> FunctionBody {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![Type::I32, Type::I32], vec![]);
        let mut body = FunctionBody::new(&module, sig);
        let a = body.local_get(Local::new(0));
        let b = body.local_get(Local::new(1));
        let sum = body.binary(BinaryOp::I32Add, a, b);
        let set = body.local_set(Local::new(0), sum);
        let cond = body.local_get(Local::new(1));
        let nop = body.nop();
        let iff = body.if_(cond, nop, None);
        let root = body.block(None, vec![set, iff]);
        body.set_root(root);
        body
    }

    #[test]
    fn visits_operands_before_parents() {
        let body = sample();
        let mut kinds = Kinds::default();
        walk(&mut kinds, &body);
        assert_eq!(
            kinds.0,
            vec![
                "local.get",
                "local.get",
                "binary",
                "local.set",
                "local.get",
                "nop",
                "if",
                "block"
            ]
        );
        assert_eq!(post_order(&body, body.root).len(), body.size());
    }

    #[test]
    fn typed_hooks_see_their_nodes() {
        let body = sample();
        let mut gets = Gets::default();
        walk(&mut gets, &body);
        assert_eq!(gets.0, vec![Local::new(0), Local::new(1), Local::new(1)]);
    }

    #[test]
    fn mutator_rewrites_in_place() {
        struct NopOut;
        impl Mutator for NopOut {
            fn visit_expr(&mut self, body: &mut FunctionBody, expr: Expr) {
                if let ExprData::If(_) = body[expr] {
                    body.replace(expr, ExprData::Nop);
                }
            }
        }
        let mut body = sample();
        walk_mut(&mut NopOut, &mut body);
        let mut kinds = Kinds::default();
        walk(&mut kinds, &body);
        assert_eq!(
            kinds.0,
            vec!["local.get", "local.get", "binary", "local.set", "nop", "block"]
        );
    }

    #[test]
    fn empty_body_is_not_walked() {
        let body = FunctionBody::default();
        let mut kinds = Kinds::default();
        walk(&mut kinds, &body);
        assert!(kinds.0.is_empty());
    }
}

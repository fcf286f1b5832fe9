//! Constant folding of integer operators.

use crate::ir::walk::{walk_mut, Mutator};
use crate::ir::*;
use crate::pass::{FunctionPass, PassOptions};

fn bool_i32(b: bool) -> Literal {
    Literal::I32(if b { 1 } else { 0 })
}

/// Evaluate a unary operator on a constant. `None` if the operator is
/// not folded.
pub fn eval_unary(op: UnaryOp, value: Literal) -> Option<Literal> {
    match (op, value) {
        (UnaryOp::I32Eqz, Literal::I32(a)) => Some(bool_i32(a == 0)),
        (UnaryOp::I32Clz, Literal::I32(a)) => Some(Literal::I32(a.leading_zeros() as i32)),
        (UnaryOp::I32Ctz, Literal::I32(a)) => Some(Literal::I32(a.trailing_zeros() as i32)),
        (UnaryOp::I32Popcnt, Literal::I32(a)) => Some(Literal::I32(a.count_ones() as i32)),
        (UnaryOp::I32Extend8S, Literal::I32(a)) => Some(Literal::I32(a as i8 as i32)),
        (UnaryOp::I32Extend16S, Literal::I32(a)) => Some(Literal::I32(a as i16 as i32)),
        (UnaryOp::I32WrapI64, Literal::I64(a)) => Some(Literal::I32(a as i32)),
        (UnaryOp::I64Eqz, Literal::I64(a)) => Some(bool_i32(a == 0)),
        (UnaryOp::I64Clz, Literal::I64(a)) => Some(Literal::I64(a.leading_zeros() as i64)),
        (UnaryOp::I64Ctz, Literal::I64(a)) => Some(Literal::I64(a.trailing_zeros() as i64)),
        (UnaryOp::I64Popcnt, Literal::I64(a)) => Some(Literal::I64(a.count_ones() as i64)),
        (UnaryOp::I64ExtendI32S, Literal::I32(a)) => Some(Literal::I64(a as i64)),
        (UnaryOp::I64ExtendI32U, Literal::I32(a)) => Some(Literal::I64(a as u32 as i64)),
        _ => None,
    }
}

/// Evaluate a binary operator on constants. `None` if the operator is
/// not folded or would trap.
pub fn eval_binary(op: BinaryOp, left: Literal, right: Literal) -> Option<Literal> {
    match (op, left, right) {
        (BinaryOp::I32Add, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a.wrapping_add(b))),
        (BinaryOp::I32Sub, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a.wrapping_sub(b))),
        (BinaryOp::I32Mul, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a.wrapping_mul(b))),
        (BinaryOp::I32DivS, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a.checked_div(b)?)),
        (BinaryOp::I32DivU, Literal::I32(a), Literal::I32(b)) => {
            Some(Literal::I32((a as u32).checked_div(b as u32)? as i32))
        }
        (BinaryOp::I32RemS, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a.checked_rem(b)?)),
        (BinaryOp::I32RemU, Literal::I32(a), Literal::I32(b)) => {
            Some(Literal::I32((a as u32).checked_rem(b as u32)? as i32))
        }
        (BinaryOp::I32And, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a & b)),
        (BinaryOp::I32Or, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a | b)),
        (BinaryOp::I32Xor, Literal::I32(a), Literal::I32(b)) => Some(Literal::I32(a ^ b)),
        (BinaryOp::I32Shl, Literal::I32(a), Literal::I32(b)) => {
            Some(Literal::I32(a.wrapping_shl(b as u32)))
        }
        (BinaryOp::I32ShrS, Literal::I32(a), Literal::I32(b)) => {
            Some(Literal::I32(a.wrapping_shr(b as u32)))
        }
        (BinaryOp::I32ShrU, Literal::I32(a), Literal::I32(b)) => {
            Some(Literal::I32((a as u32).wrapping_shr(b as u32) as i32))
        }
        (BinaryOp::I32Eq, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a == b)),
        (BinaryOp::I32Ne, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a != b)),
        (BinaryOp::I32LtS, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a < b)),
        (BinaryOp::I32LtU, Literal::I32(a), Literal::I32(b)) => Some(bool_i32((a as u32) < (b as u32))),
        (BinaryOp::I32GtS, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a > b)),
        (BinaryOp::I32GtU, Literal::I32(a), Literal::I32(b)) => Some(bool_i32((a as u32) > (b as u32))),
        (BinaryOp::I32LeS, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a <= b)),
        (BinaryOp::I32LeU, Literal::I32(a), Literal::I32(b)) => {
            Some(bool_i32((a as u32) <= (b as u32)))
        }
        (BinaryOp::I32GeS, Literal::I32(a), Literal::I32(b)) => Some(bool_i32(a >= b)),
        (BinaryOp::I32GeU, Literal::I32(a), Literal::I32(b)) => {
            Some(bool_i32((a as u32) >= (b as u32)))
        }

        (BinaryOp::I64Add, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a.wrapping_add(b))),
        (BinaryOp::I64Sub, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a.wrapping_sub(b))),
        (BinaryOp::I64Mul, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a.wrapping_mul(b))),
        (BinaryOp::I64DivS, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a.checked_div(b)?)),
        (BinaryOp::I64DivU, Literal::I64(a), Literal::I64(b)) => {
            Some(Literal::I64((a as u64).checked_div(b as u64)? as i64))
        }
        (BinaryOp::I64RemS, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a.checked_rem(b)?)),
        (BinaryOp::I64RemU, Literal::I64(a), Literal::I64(b)) => {
            Some(Literal::I64((a as u64).checked_rem(b as u64)? as i64))
        }
        (BinaryOp::I64And, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a & b)),
        (BinaryOp::I64Or, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a | b)),
        (BinaryOp::I64Xor, Literal::I64(a), Literal::I64(b)) => Some(Literal::I64(a ^ b)),
        (BinaryOp::I64Shl, Literal::I64(a), Literal::I64(b)) => {
            Some(Literal::I64(a.wrapping_shl(b as u32)))
        }
        (BinaryOp::I64ShrS, Literal::I64(a), Literal::I64(b)) => {
            Some(Literal::I64(a.wrapping_shr(b as u32)))
        }
        (BinaryOp::I64ShrU, Literal::I64(a), Literal::I64(b)) => {
            Some(Literal::I64((a as u64).wrapping_shr(b as u32) as i64))
        }
        (BinaryOp::I64Eq, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a == b)),
        (BinaryOp::I64Ne, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a != b)),
        (BinaryOp::I64LtS, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a < b)),
        (BinaryOp::I64LtU, Literal::I64(a), Literal::I64(b)) => Some(bool_i32((a as u64) < (b as u64))),
        (BinaryOp::I64GtS, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a > b)),
        (BinaryOp::I64GtU, Literal::I64(a), Literal::I64(b)) => Some(bool_i32((a as u64) > (b as u64))),
        (BinaryOp::I64LeS, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a <= b)),
        (BinaryOp::I64LeU, Literal::I64(a), Literal::I64(b)) => {
            Some(bool_i32((a as u64) <= (b as u64)))
        }
        (BinaryOp::I64GeS, Literal::I64(a), Literal::I64(b)) => Some(bool_i32(a >= b)),
        (BinaryOp::I64GeU, Literal::I64(a), Literal::I64(b)) => {
            Some(bool_i32((a as u64) >= (b as u64)))
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Folder {
    folded: usize,
}

impl Mutator for Folder {
    fn visit_expr(&mut self, body: &mut FunctionBody, expr: Expr) {
        let constant = |e: Expr| match body[e] {
            ExprData::Const(value) => Some(value),
            _ => None,
        };
        let result = match &body[expr] {
            ExprData::Unary(u) => constant(u.value).and_then(|v| eval_unary(u.op, v)),
            ExprData::Binary(b) => match (constant(b.left), constant(b.right)) {
                (Some(l), Some(r)) => eval_binary(b.op, l, r),
                _ => None,
            },
            _ => None,
        };
        if let Some(value) = result {
            body.replace(expr, ExprData::Const(value));
            self.folded += 1;
        }
    }
}

/// Folds operators whose operands are all constants.
#[derive(Clone, Debug, Default)]
pub struct Precompute;

impl FunctionPass for Precompute {
    fn run_on_function(
        &mut self,
        _options: &PassOptions,
        _module: &Module,
        func: Func,
        body: &mut FunctionBody,
    ) -> anyhow::Result<()> {
        let mut folder = Folder::default();
        walk_mut(&mut folder, body);
        log::debug!("precompute: folded {} expressions in {}", folder.folded, func);
        Ok(())
    }

    fn create(&self) -> Box<dyn FunctionPass> {
        Box::new(Precompute)
    }

    fn is_function_parallel(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn eval() {
        assert_eq!(
            eval_binary(BinaryOp::I32Add, Literal::I32(i32::MAX), Literal::I32(1)),
            Some(Literal::I32(i32::MIN))
        );
        assert_eq!(
            eval_binary(BinaryOp::I32DivU, Literal::I32(7), Literal::I32(0)),
            None
        );
        assert_eq!(
            eval_binary(BinaryOp::I64DivS, Literal::I64(i64::MIN), Literal::I64(-1)),
            None
        );
        assert_eq!(
            eval_binary(BinaryOp::I32LtU, Literal::I32(-1), Literal::I32(1)),
            Some(Literal::I32(0))
        );
        assert_eq!(
            eval_binary(BinaryOp::I32ShrU, Literal::I32(-1), Literal::I32(36)),
            Some(Literal::I32(0x0fff_ffff))
        );
        assert_eq!(
            eval_unary(UnaryOp::I64ExtendI32U, Literal::I32(-1)),
            Some(Literal::I64(0xffff_ffff))
        );
        assert_eq!(eval_unary(UnaryOp::F32Neg, Literal::F32(0)), None);
    }

    #[test]
    fn folds_nested_trees() {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![Type::I32], vec![]);
        let mut body = FunctionBody::new(&module, sig);
        let a = body.i32_const(6);
        let b = body.i32_const(7);
        let mul = body.binary(BinaryOp::I32Mul, a, b);
        let c = body.i32_const(2);
        let add = body.binary(BinaryOp::I32Add, mul, c);
        let eqz = body.unary(UnaryOp::I32Eqz, add);
        let get = body.local_get(Local::new(0));
        let dynamic = body.binary(BinaryOp::I32Add, get, eqz);
        let set = body.local_set(Local::new(0), dynamic);
        body.set_root(set);

        Precompute
            .run_on_function(&PassOptions::default(), &module, Func::new(0), &mut body)
            .unwrap();
        assert_eq!(body[mul], ExprData::Const(Literal::I32(42)));
        assert_eq!(body[add], ExprData::Const(Literal::I32(44)));
        assert_eq!(body[eqz], ExprData::Const(Literal::I32(0)));
        assert!(matches!(body[dynamic], ExprData::Binary(_)));
    }
}

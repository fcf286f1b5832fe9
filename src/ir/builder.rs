//! Convenience constructors for expression nodes.

use super::*;

impl FunctionBody {
    pub fn nop(&mut self) -> Expr {
        self.add_expr(ExprData::Nop)
    }

    pub fn unreachable(&mut self) -> Expr {
        self.add_expr(ExprData::Unreachable)
    }

    pub fn constant(&mut self, value: Literal) -> Expr {
        self.add_expr(ExprData::Const(value))
    }

    pub fn i32_const(&mut self, value: i32) -> Expr {
        self.constant(Literal::I32(value))
    }

    pub fn i64_const(&mut self, value: i64) -> Expr {
        self.constant(Literal::I64(value))
    }

    pub fn block(&mut self, label: Option<Label>, children: Vec<Expr>) -> Expr {
        self.add_expr(ExprData::Block(Block { label, children }))
    }

    pub fn if_(&mut self, condition: Expr, if_true: Expr, if_false: Option<Expr>) -> Expr {
        self.add_expr(ExprData::If(If {
            condition,
            if_true,
            if_false,
        }))
    }

    pub fn loop_(&mut self, label: Label, body: Expr) -> Expr {
        self.add_expr(ExprData::Loop(Loop { label, body }))
    }

    pub fn br(&mut self, label: Label) -> Expr {
        self.add_expr(ExprData::Break(Break {
            label,
            value: None,
            condition: None,
        }))
    }

    pub fn br_if(&mut self, label: Label, condition: Expr) -> Expr {
        self.add_expr(ExprData::Break(Break {
            label,
            value: None,
            condition: Some(condition),
        }))
    }

    pub fn br_table(&mut self, targets: Vec<Label>, default: Label, condition: Expr) -> Expr {
        self.add_expr(ExprData::Switch(Switch {
            targets,
            default,
            value: None,
            condition,
        }))
    }

    pub fn call(&mut self, target: Func, operands: Vec<Expr>) -> Expr {
        self.add_expr(ExprData::Call(Call { target, operands }))
    }

    pub fn call_indirect(&mut self, sig: Signature, target: Expr, operands: Vec<Expr>) -> Expr {
        self.add_expr(ExprData::CallIndirect(CallIndirect {
            sig,
            operands,
            target,
        }))
    }

    pub fn local_get(&mut self, local: Local) -> Expr {
        self.add_expr(ExprData::LocalGet(LocalGet { local }))
    }

    pub fn local_set(&mut self, local: Local, value: Expr) -> Expr {
        self.add_expr(ExprData::LocalSet(LocalSet {
            local,
            value,
            tee: false,
        }))
    }

    pub fn local_tee(&mut self, local: Local, value: Expr) -> Expr {
        self.add_expr(ExprData::LocalSet(LocalSet {
            local,
            value,
            tee: true,
        }))
    }

    pub fn global_get(&mut self, global: Global) -> Expr {
        self.add_expr(ExprData::GlobalGet(GlobalGet { global }))
    }

    pub fn global_set(&mut self, global: Global, value: Expr) -> Expr {
        self.add_expr(ExprData::GlobalSet(GlobalSet { global, value }))
    }

    /// A full-width load of `ty`.
    pub fn load(&mut self, ty: Type, memarg: MemArg, ptr: Expr) -> Expr {
        self.add_expr(ExprData::Load(Load {
            ty,
            bytes: type_bytes(ty),
            signed: false,
            memarg,
            ptr,
        }))
    }

    /// A full-width store of `ty`.
    pub fn store(&mut self, ty: Type, memarg: MemArg, ptr: Expr, value: Expr) -> Expr {
        self.add_expr(ExprData::Store(Store {
            ty,
            bytes: type_bytes(ty),
            memarg,
            ptr,
            value,
        }))
    }

    pub fn unary(&mut self, op: UnaryOp, value: Expr) -> Expr {
        self.add_expr(ExprData::Unary(Unary { op, value }))
    }

    pub fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.add_expr(ExprData::Binary(Binary { op, left, right }))
    }

    pub fn select(&mut self, if_true: Expr, if_false: Expr, condition: Expr) -> Expr {
        self.add_expr(ExprData::Select(Select {
            if_true,
            if_false,
            condition,
        }))
    }

    pub fn drop_(&mut self, value: Expr) -> Expr {
        self.add_expr(ExprData::Drop(DropValue { value }))
    }

    pub fn return_(&mut self, value: Option<Expr>) -> Expr {
        self.add_expr(ExprData::Return(Return { value }))
    }
}

fn type_bytes(ty: Type) -> u8 {
    match ty {
        Type::I32 | Type::F32 => 4,
        Type::I64 | Type::F64 => 8,
    }
}

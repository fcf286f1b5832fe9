//! Expression nodes.
//!
//! Each node kind is its own struct so that visitors receive typed
//! data. Nodes refer to their operands only through `Expr` handles
//! into the owning function's arena.

use super::{Expr, Func, Global, Label, Literal, Local, Signature, Type};
use smallvec::{smallvec, SmallVec};

/// Static operands of a memory access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MemArg {
    pub offset: u64,
    pub align: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub label: Option<Label>,
    pub children: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct If {
    pub condition: Expr,
    pub if_true: Expr,
    pub if_false: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Loop {
    pub label: Label,
    pub body: Expr,
}

/// `br` (no condition) or `br_if` (with condition).
#[derive(Clone, Debug, PartialEq)]
pub struct Break {
    pub label: Label,
    pub value: Option<Expr>,
    pub condition: Option<Expr>,
}

/// `br_table`.
#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
    pub targets: Vec<Label>,
    pub default: Label,
    pub value: Option<Expr>,
    pub condition: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub target: Func,
    pub operands: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallIndirect {
    pub sig: Signature,
    pub operands: Vec<Expr>,
    pub target: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalGet {
    pub local: Local,
}

/// `local.set`, or `local.tee` when `tee` is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalSet {
    pub local: Local,
    pub value: Expr,
    pub tee: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalGet {
    pub global: Global,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalSet {
    pub global: Global,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Load {
    pub ty: Type,
    pub bytes: u8,
    pub signed: bool,
    pub memarg: MemArg,
    pub ptr: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Store {
    pub ty: Type,
    pub bytes: u8,
    pub memarg: MemArg,
    pub ptr: Expr,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Select {
    pub if_true: Expr,
    pub if_false: Expr,
    pub condition: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropValue {
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Return {
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprData {
    Block(Block),
    If(If),
    Loop(Loop),
    Break(Break),
    Switch(Switch),
    Call(Call),
    CallIndirect(CallIndirect),
    LocalGet(LocalGet),
    LocalSet(LocalSet),
    GlobalGet(GlobalGet),
    GlobalSet(GlobalSet),
    Load(Load),
    Store(Store),
    Const(Literal),
    Unary(Unary),
    Binary(Binary),
    Select(Select),
    Drop(DropValue),
    Return(Return),
    Nop,
    Unreachable,
}

impl Default for ExprData {
    fn default() -> Self {
        ExprData::Nop
    }
}

impl ExprData {
    /// Operands in evaluation order. A post-order walk visits these
    /// left to right before the node itself.
    pub fn children(&self) -> SmallVec<[Expr; 4]> {
        match self {
            ExprData::Block(b) => b.children.iter().copied().collect(),
            ExprData::If(i) => {
                let mut ret = smallvec![i.condition, i.if_true];
                ret.extend(i.if_false);
                ret
            }
            ExprData::Loop(l) => smallvec![l.body],
            ExprData::Break(b) => b.value.into_iter().chain(b.condition).collect(),
            ExprData::Switch(s) => {
                let mut ret: SmallVec<[Expr; 4]> = s.value.into_iter().collect();
                ret.push(s.condition);
                ret
            }
            ExprData::Call(c) => c.operands.iter().copied().collect(),
            ExprData::CallIndirect(c) => {
                let mut ret: SmallVec<[Expr; 4]> = c.operands.iter().copied().collect();
                ret.push(c.target);
                ret
            }
            ExprData::LocalSet(s) => smallvec![s.value],
            ExprData::GlobalSet(s) => smallvec![s.value],
            ExprData::Load(l) => smallvec![l.ptr],
            ExprData::Store(s) => smallvec![s.ptr, s.value],
            ExprData::Unary(u) => smallvec![u.value],
            ExprData::Binary(b) => smallvec![b.left, b.right],
            ExprData::Select(s) => smallvec![s.if_true, s.if_false, s.condition],
            ExprData::Drop(d) => smallvec![d.value],
            ExprData::Return(r) => r.value.into_iter().collect(),
            ExprData::LocalGet(_)
            | ExprData::GlobalGet(_)
            | ExprData::Const(_)
            | ExprData::Nop
            | ExprData::Unreachable => smallvec![],
        }
    }

    /// The label a structured node declares, if any.
    pub fn declared_label(&self) -> Option<Label> {
        match self {
            ExprData::Block(b) => b.label,
            ExprData::Loop(l) => Some(l.label),
            _ => None,
        }
    }

    /// Short textual name of the node kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprData::Block(_) => "block",
            ExprData::If(_) => "if",
            ExprData::Loop(_) => "loop",
            ExprData::Break(b) if b.condition.is_some() => "br_if",
            ExprData::Break(_) => "br",
            ExprData::Switch(_) => "br_table",
            ExprData::Call(_) => "call",
            ExprData::CallIndirect(_) => "call_indirect",
            ExprData::LocalGet(_) => "local.get",
            ExprData::LocalSet(s) if s.tee => "local.tee",
            ExprData::LocalSet(_) => "local.set",
            ExprData::GlobalGet(_) => "global.get",
            ExprData::GlobalSet(_) => "global.set",
            ExprData::Load(_) => "load",
            ExprData::Store(_) => "store",
            ExprData::Const(_) => "const",
            ExprData::Unary(_) => "unary",
            ExprData::Binary(_) => "binary",
            ExprData::Select(_) => "select",
            ExprData::Drop(_) => "drop",
            ExprData::Return(_) => "return",
            ExprData::Nop => "nop",
            ExprData::Unreachable => "unreachable",
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, ExprData::Const(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    I32Eqz,
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Extend8S,
    I32Extend16S,
    I32WrapI64,
    I64Eqz,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64ExtendI32S,
    I64ExtendI32U,
    F32Neg,
    F32Abs,
    F64Neg,
    F64Abs,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::I32Eqz => "i32.eqz",
            UnaryOp::I32Clz => "i32.clz",
            UnaryOp::I32Ctz => "i32.ctz",
            UnaryOp::I32Popcnt => "i32.popcnt",
            UnaryOp::I32Extend8S => "i32.extend8_s",
            UnaryOp::I32Extend16S => "i32.extend16_s",
            UnaryOp::I32WrapI64 => "i32.wrap_i64",
            UnaryOp::I64Eqz => "i64.eqz",
            UnaryOp::I64Clz => "i64.clz",
            UnaryOp::I64Ctz => "i64.ctz",
            UnaryOp::I64Popcnt => "i64.popcnt",
            UnaryOp::I64ExtendI32S => "i64.extend_i32_s",
            UnaryOp::I64ExtendI32U => "i64.extend_i32_u",
            UnaryOp::F32Neg => "f32.neg",
            UnaryOp::F32Abs => "f32.abs",
            UnaryOp::F64Neg => "f64.neg",
            UnaryOp::F64Abs => "f64.abs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::I32Add => "i32.add",
            BinaryOp::I32Sub => "i32.sub",
            BinaryOp::I32Mul => "i32.mul",
            BinaryOp::I32DivS => "i32.div_s",
            BinaryOp::I32DivU => "i32.div_u",
            BinaryOp::I32RemS => "i32.rem_s",
            BinaryOp::I32RemU => "i32.rem_u",
            BinaryOp::I32And => "i32.and",
            BinaryOp::I32Or => "i32.or",
            BinaryOp::I32Xor => "i32.xor",
            BinaryOp::I32Shl => "i32.shl",
            BinaryOp::I32ShrS => "i32.shr_s",
            BinaryOp::I32ShrU => "i32.shr_u",
            BinaryOp::I32Eq => "i32.eq",
            BinaryOp::I32Ne => "i32.ne",
            BinaryOp::I32LtS => "i32.lt_s",
            BinaryOp::I32LtU => "i32.lt_u",
            BinaryOp::I32GtS => "i32.gt_s",
            BinaryOp::I32GtU => "i32.gt_u",
            BinaryOp::I32LeS => "i32.le_s",
            BinaryOp::I32LeU => "i32.le_u",
            BinaryOp::I32GeS => "i32.ge_s",
            BinaryOp::I32GeU => "i32.ge_u",
            BinaryOp::I64Add => "i64.add",
            BinaryOp::I64Sub => "i64.sub",
            BinaryOp::I64Mul => "i64.mul",
            BinaryOp::I64DivS => "i64.div_s",
            BinaryOp::I64DivU => "i64.div_u",
            BinaryOp::I64RemS => "i64.rem_s",
            BinaryOp::I64RemU => "i64.rem_u",
            BinaryOp::I64And => "i64.and",
            BinaryOp::I64Or => "i64.or",
            BinaryOp::I64Xor => "i64.xor",
            BinaryOp::I64Shl => "i64.shl",
            BinaryOp::I64ShrS => "i64.shr_s",
            BinaryOp::I64ShrU => "i64.shr_u",
            BinaryOp::I64Eq => "i64.eq",
            BinaryOp::I64Ne => "i64.ne",
            BinaryOp::I64LtS => "i64.lt_s",
            BinaryOp::I64LtU => "i64.lt_u",
            BinaryOp::I64GtS => "i64.gt_s",
            BinaryOp::I64GtU => "i64.gt_u",
            BinaryOp::I64LeS => "i64.le_s",
            BinaryOp::I64LeU => "i64.le_u",
            BinaryOp::I64GeS => "i64.ge_s",
            BinaryOp::I64GeU => "i64.ge_u",
            BinaryOp::F32Add => "f32.add",
            BinaryOp::F32Sub => "f32.sub",
            BinaryOp::F32Mul => "f32.mul",
            BinaryOp::F32Div => "f32.div",
            BinaryOp::F64Add => "f64.add",
            BinaryOp::F64Sub => "f64.sub",
            BinaryOp::F64Mul => "f64.mul",
            BinaryOp::F64Div => "f64.div",
        }
    }
}

//! Intermediate representation: Wasm function bodies as expression
//! trees, each stored in a per-function arena.

use crate::declare_entity;

mod builder;
mod display;
mod expr;
mod func;
mod module;
mod stack;
mod validate;
pub mod walk;

pub use display::*;
pub use expr::*;
pub use func::*;
pub use module::*;
pub use stack::*;

declare_entity!(Func, "func");
declare_entity!(Signature, "sig");
declare_entity!(Global, "global");
declare_entity!(Local, "local");
declare_entity!(Expr, "expr");
declare_entity!(Label, "label");

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    I32,
    I64,
    F32,
    F64,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
        }
    }
}

/// A constant. Floats are kept as raw bits so that literals compare
/// and hash exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    I32(i32),
    I64(i64),
    F32(u32),
    F64(u64),
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::I32(_) => Type::I32,
            Literal::I64(_) => Type::I64,
            Literal::F32(_) => Type::F32,
            Literal::F64(_) => Type::F64,
        }
    }

    /// The zero value of a type, used for default global initializers.
    pub fn zero(ty: Type) -> Literal {
        match ty {
            Type::I32 => Literal::I32(0),
            Type::I64 => Literal::I64(0),
            Type::F32 => Literal::F32(0),
            Type::F64 => Literal::F64(0),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Literal::I32(v) => write!(f, "i32.const {}", v),
            Literal::I64(v) => write!(f, "i64.const {}", v),
            Literal::F32(bits) => write!(f, "f32.const {}", f32::from_bits(bits)),
            Literal::F64(bits) => write!(f, "f64.const {}", f64::from_bits(bits)),
        }
    }
}

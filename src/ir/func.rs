use super::{Expr, ExprData, Label, Local, Module, Signature, StackIr, Type};
use crate::entity::{EntityRef, EntityVec};

#[derive(Clone, Debug, PartialEq)]
pub enum FuncDecl {
    Import(Signature, String),
    Body(Signature, String, FunctionBody),
}

impl FuncDecl {
    pub fn sig(&self) -> Signature {
        match self {
            FuncDecl::Import(sig, ..) => *sig,
            FuncDecl::Body(sig, ..) => *sig,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FuncDecl::Import(_, name) => &name[..],
            FuncDecl::Body(_, name, _) => &name[..],
        }
    }

    pub fn body(&self) -> Option<&FunctionBody> {
        match self {
            FuncDecl::Body(_, _, body) => Some(body),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut FunctionBody> {
        match self {
            FuncDecl::Body(_, _, body) => Some(body),
            _ => None,
        }
    }
}

/// A function body: an arena of expressions plus the handle of the
/// root expression.
///
/// Nodes are never removed from the arena. An edit rebinds the data
/// stored at an existing handle (see [`FunctionBody::replace`]), so
/// every parent keeps pointing at a valid node; nodes that fall out of
/// the tree this way simply become unreachable from `root`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionBody {
    /// How many parameters the function has. (Their types are the
    /// first `n_params` entries in `locals`.)
    pub n_params: usize,
    /// Return types of the function.
    pub results: Vec<Type>,
    /// Local types, *including* params.
    pub locals: EntityVec<Local, Type>,
    /// Expression arena.
    pub exprs: EntityVec<Expr, ExprData>,
    /// Root of the body tree. Invalid until a body is attached.
    pub root: Expr,
    /// Number of labels allocated so far.
    pub n_labels: u32,
    /// Lowered form derived from the tree, if one has been generated
    /// and not yet invalidated.
    pub stack_ir: Option<StackIr>,
}

impl FunctionBody {
    pub fn new(module: &Module, sig: Signature) -> FunctionBody {
        let locals = EntityVec::from(module.signatures[sig].params.clone());
        let n_params = locals.len();
        let results = module.signatures[sig].results.clone();
        FunctionBody {
            n_params,
            results,
            locals,
            ..FunctionBody::default()
        }
    }

    pub fn add_local(&mut self, ty: Type) -> Local {
        self.locals.push(ty)
    }

    pub fn add_label(&mut self) -> Label {
        let label = Label::new(self.n_labels as usize);
        self.n_labels += 1;
        label
    }

    pub fn add_expr(&mut self, data: ExprData) -> Expr {
        let expr = self.exprs.push(data);
        log::trace!("add_expr: {} = {:?}", expr, self.exprs[expr]);
        expr
    }

    /// Rebind `expr` to new data. Children of the old data that the
    /// new data does not mention become unreachable.
    pub fn replace(&mut self, expr: Expr, data: ExprData) {
        log::trace!("replace: {} {:?} -> {:?}", expr, self.exprs[expr], data);
        self.exprs[expr] = data;
    }

    pub fn set_root(&mut self, root: Expr) {
        self.root = root;
    }

    pub fn has_stack_ir(&self) -> bool {
        self.stack_ir.is_some()
    }

    /// Discard derived forms after the tree has been modified.
    pub fn invalidate(&mut self) {
        if self.stack_ir.take().is_some() {
            log::trace!("invalidate: dropped stack IR");
        }
    }

    /// Number of expressions reachable from the root.
    pub fn size(&self) -> usize {
        if self.root.is_invalid() {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(expr) = stack.pop() {
            count += 1;
            stack.extend(self.exprs[expr].children());
        }
        count
    }
}

impl std::ops::Index<Expr> for FunctionBody {
    type Output = ExprData;
    fn index(&self, expr: Expr) -> &ExprData {
        &self.exprs[expr]
    }
}

use super::{Func, FuncDecl, FunctionBody, Global, Literal, ModuleDisplay, Signature, Type};
use crate::entity::EntityVec;

/// A Wasm module, represented as a collection of IR entities.
///
/// The pass engine borrows a module for the duration of a run and may
/// rewrite function bodies, but never replaces the module itself.
/// Modules are plain values: cloning one takes a full snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    /// The functions in this module: imports and bodies.
    pub funcs: EntityVec<Func, FuncDecl>,
    /// Type signatures, referred to by `funcs` and by indirect calls.
    pub signatures: EntityVec<Signature, SignatureData>,
    /// Global variables in this module.
    pub globals: EntityVec<Global, GlobalData>,
    /// Exports from this module.
    pub exports: Vec<Export>,
    /// The "start function" invoked at instantiation, if any.
    pub start_func: Option<Func>,
}

/// A function signature definition.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignatureData {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

/// A global-variable definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlobalData {
    pub name: String,
    pub ty: Type,
    pub init: Literal,
    pub mutable: bool,
}

/// A module export definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    /// The name of this export.
    pub name: String,
    /// The kind of export and its specific entity index.
    pub kind: ExportKind,
}

/// The kind of a Wasm export, including the specific entity index
/// that this export directive exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Func(Func),
    Global(Global),
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExportKind::Func(func) => write!(f, "{}", func),
            ExportKind::Global(global) => write!(f, "{}", global),
        }
    }
}

impl Module {
    /// Create a new empty Wasm module, ready for entities to be added.
    pub fn empty() -> Module {
        Module::default()
    }

    pub fn add_signature(&mut self, params: Vec<Type>, results: Vec<Type>) -> Signature {
        let data = SignatureData { params, results };
        if let Some((sig, _)) = self.signatures.entries().find(|(_, d)| **d == data) {
            return sig;
        }
        self.signatures.push(data)
    }

    pub fn add_import(&mut self, name: &str, sig: Signature) -> Func {
        self.funcs.push(FuncDecl::Import(sig, name.to_owned()))
    }

    pub fn add_func(&mut self, name: &str, sig: Signature, body: FunctionBody) -> Func {
        self.funcs.push(FuncDecl::Body(sig, name.to_owned(), body))
    }

    pub fn add_global(&mut self, name: &str, ty: Type, mutable: bool) -> Global {
        self.globals.push(GlobalData {
            name: name.to_owned(),
            ty,
            init: Literal::zero(ty),
            mutable,
        })
    }

    pub fn add_export(&mut self, name: &str, kind: ExportKind) {
        self.exports.push(Export {
            name: name.to_owned(),
            kind,
        });
    }

    /// Functions exported under `name`.
    pub fn exported_funcs<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Func> + 'a {
        self.exports
            .iter()
            .filter(move |export| export.name == name)
            .filter_map(|export| match export.kind {
                ExportKind::Func(func) => Some(func),
                _ => None,
            })
    }

    pub fn func_name(&self, func: Func) -> &str {
        self.funcs
            .get(func)
            .map(|decl| decl.name())
            .unwrap_or("<invalid>")
    }

    /// Perform some work on each function body.
    pub fn per_func_body<F: FnMut(&mut FunctionBody)>(&mut self, mut f: F) {
        for func_decl in self.funcs.values_mut() {
            if let Some(body) = func_decl.body_mut() {
                f(body);
            }
        }
    }

    /// Move every function body out of the module, leaving empty
    /// bodies behind. Used to hand bodies to independent workers while
    /// the rest of the module stays readable.
    pub(crate) fn take_bodies(&mut self) -> Vec<(Func, FunctionBody)> {
        self.funcs
            .entries_mut()
            .filter_map(|(func, decl)| decl.body_mut().map(|body| (func, std::mem::take(body))))
            .collect()
    }

    pub(crate) fn restore_bodies(&mut self, bodies: Vec<(Func, FunctionBody)>) {
        for (func, body) in bodies {
            if let Some(slot) = self.funcs[func].body_mut() {
                *slot = body;
            }
        }
    }

    /// Return a wrapper that implements Display on this module,
    /// pretty-printing it as text.
    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signatures_are_interned() {
        let mut module = Module::empty();
        let a = module.add_signature(vec![Type::I32], vec![]);
        let b = module.add_signature(vec![Type::I32], vec![]);
        let c = module.add_signature(vec![], vec![Type::I32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(module.signatures.len(), 2);
    }

    #[test]
    fn take_and_restore_bodies() {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![], vec![]);
        module.add_import("imported", sig);
        let mut body = FunctionBody::new(&module, sig);
        let nop = body.nop();
        body.set_root(nop);
        let f = module.add_func("f", sig, body.clone());

        let taken = module.take_bodies();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].0, f);
        assert_eq!(module.funcs[f].body(), Some(&FunctionBody::default()));

        module.restore_bodies(taken);
        assert_eq!(module.funcs[f].body(), Some(&body));
    }
}

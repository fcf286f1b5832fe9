//! Structural validation of modules.

use super::*;
use crate::entity::{EntityRef, PerEntity};
use crate::errors::ValidationError;
use fxhash::FxHashSet;

#[derive(Clone, Copy, Debug)]
enum Task {
    Check(Expr),
    CloseScope,
}

impl Module {
    /// Check that every function body is a well-formed tree and that
    /// every entity it references exists. With `globally`, also check
    /// module-level declarations: exports and the start function.
    pub fn validate(&self, globally: bool) -> Result<(), ValidationError> {
        for (func, decl) in self.funcs.entries() {
            if !self.signatures.contains(decl.sig()) {
                return Err(ValidationError::in_func(
                    func,
                    format!("signature {} does not exist", decl.sig()),
                ));
            }
            if let Some(body) = decl.body() {
                self.validate_body(func, body)?;
            }
        }

        if globally {
            let mut names = FxHashSet::default();
            for export in &self.exports {
                if !names.insert(&export.name[..]) {
                    return Err(ValidationError::module(format!(
                        "duplicate export name \"{}\"",
                        export.name
                    )));
                }
                let exists = match export.kind {
                    ExportKind::Func(func) => self.funcs.contains(func),
                    ExportKind::Global(global) => self.globals.contains(global),
                };
                if !exists {
                    return Err(ValidationError::module(format!(
                        "export \"{}\" refers to missing {}",
                        export.name, export.kind
                    )));
                }
            }
            if let Some(start) = self.start_func {
                if !self.funcs.contains(start) {
                    return Err(ValidationError::module(format!(
                        "start function {} does not exist",
                        start
                    )));
                }
                let sig = &self.signatures[self.funcs[start].sig()];
                if !sig.params.is_empty() || !sig.results.is_empty() {
                    return Err(ValidationError::module(format!(
                        "start function {} must take and return nothing",
                        start
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_body(&self, func: Func, body: &FunctionBody) -> Result<(), ValidationError> {
        let err = |message: String| ValidationError::in_func(func, message);

        if body.root.is_invalid() {
            return Err(err("function has no root expression".to_owned()));
        }
        if !body.exprs.contains(body.root) {
            return Err(err(format!("root {} is out of range", body.root)));
        }

        let mut parents: PerEntity<Expr, u32> = PerEntity::default();
        let mut scope: Vec<Label> = vec![];
        let mut tasks: Vec<Task> = vec![Task::Check(body.root)];

        while let Some(task) = tasks.pop() {
            let expr = match task {
                Task::Check(expr) => expr,
                Task::CloseScope => {
                    scope.pop();
                    continue;
                }
            };

            let data = &body[expr];
            let in_scope = |label: Label| scope.contains(&label);
            match data {
                ExprData::Break(b) if !in_scope(b.label) => {
                    return Err(err(format!("{}: {} is not in scope", expr, b.label)));
                }
                ExprData::Switch(s) => {
                    for &label in s.targets.iter().chain(std::iter::once(&s.default)) {
                        if !in_scope(label) {
                            return Err(err(format!("{}: {} is not in scope", expr, label)));
                        }
                    }
                }
                ExprData::LocalGet(LocalGet { local }) | ExprData::LocalSet(LocalSet { local, .. })
                    if !body.locals.contains(*local) =>
                {
                    return Err(err(format!("{}: {} does not exist", expr, local)));
                }
                ExprData::GlobalGet(GlobalGet { global }) if !self.globals.contains(*global) => {
                    return Err(err(format!("{}: {} does not exist", expr, global)));
                }
                ExprData::GlobalSet(GlobalSet { global, .. }) => {
                    match self.globals.get(*global) {
                        None => {
                            return Err(err(format!("{}: {} does not exist", expr, global)));
                        }
                        Some(data) if !data.mutable => {
                            return Err(err(format!("{}: {} is immutable", expr, global)));
                        }
                        _ => {}
                    }
                }
                ExprData::Call(call) => {
                    let decl = self
                        .funcs
                        .get(call.target)
                        .ok_or_else(|| err(format!("{}: {} does not exist", expr, call.target)))?;
                    let expected = self
                        .signatures
                        .get(decl.sig())
                        .map(|sig| sig.params.len())
                        .unwrap_or(0);
                    if call.operands.len() != expected {
                        return Err(err(format!(
                            "{}: call to {} with {} operands, expected {}",
                            expr,
                            call.target,
                            call.operands.len(),
                            expected
                        )));
                    }
                }
                ExprData::CallIndirect(call) => {
                    let sig = self
                        .signatures
                        .get(call.sig)
                        .ok_or_else(|| err(format!("{}: {} does not exist", expr, call.sig)))?;
                    if call.operands.len() != sig.params.len() {
                        return Err(err(format!(
                            "{}: indirect call with {} operands, expected {}",
                            expr,
                            call.operands.len(),
                            sig.params.len()
                        )));
                    }
                }
                _ => {}
            }

            let children = data.children();
            for &child in &children {
                if !body.exprs.contains(child) {
                    return Err(err(format!("{}: operand {} is out of range", expr, child)));
                }
                parents[child] += 1;
                if parents[child] > 1 || child == body.root {
                    return Err(err(format!("{} has more than one parent", child)));
                }
            }

            if let Some(label) = data.declared_label() {
                if scope.contains(&label) {
                    return Err(err(format!("{}: {} is already in scope", expr, label)));
                }
                scope.push(label);
                tasks.push(Task::CloseScope);
            }
            for &child in children.iter().rev() {
                tasks.push(Task::Check(child));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn module_with(f: impl FnOnce(&mut Module, &mut FunctionBody)) -> Module {
        let mut module = Module::empty();
        let sig = module.add_signature(vec![Type::I32], vec![]);
        let mut body = FunctionBody::new(&module, sig);
        f(&mut module, &mut body);
        module.add_func("f", sig, body);
        module
    }

    #[test]
    fn well_formed_body_validates() {
        let module = module_with(|_, body| {
            let label = body.add_label();
            let get = body.local_get(Local::new(0));
            let br = body.br_if(label, get);
            let inner = body.block(None, vec![br]);
            let root = body.loop_(label, inner);
            body.set_root(root);
        });
        assert_eq!(module.validate(true), Ok(()));
    }

    #[test]
    fn shared_node_is_rejected() {
        let module = module_with(|_, body| {
            let get = body.local_get(Local::new(0));
            let root = body.binary(BinaryOp::I32Add, get, get);
            body.set_root(root);
        });
        let e = module.validate(false).unwrap_err();
        assert!(e.message.contains("more than one parent"), "{}", e);
    }

    #[test]
    fn label_out_of_scope_is_rejected() {
        let module = module_with(|_, body| {
            let label = body.add_label();
            let br = body.br(label);
            let root = body.block(None, vec![br]);
            body.set_root(root);
        });
        assert!(module.validate(false).is_err());
    }

    #[test]
    fn label_scope_ends_with_its_construct() {
        let module = module_with(|_, body| {
            let label = body.add_label();
            let nop = body.nop();
            let inner = body.block(Some(label), vec![nop]);
            let br = body.br(label);
            let root = body.block(None, vec![inner, br]);
            body.set_root(root);
        });
        assert!(module.validate(false).is_err());
    }

    #[test]
    fn immutable_global_set_is_rejected() {
        let module = module_with(|module, body| {
            let g = module.add_global("g", Type::I32, false);
            let c = body.i32_const(1);
            let root = body.global_set(g, c);
            body.set_root(root);
        });
        let e = module.validate(false).unwrap_err();
        assert!(e.message.contains("immutable"), "{}", e);
    }

    #[test]
    fn call_arity_is_checked() {
        let module = module_with(|module, body| {
            let sig = module.add_signature(vec![Type::I32, Type::I32], vec![]);
            let callee = module.add_import("callee", sig);
            let c = body.i32_const(1);
            let root = body.call(callee, vec![c]);
            body.set_root(root);
        });
        assert!(module.validate(false).is_err());
    }

    #[test]
    fn global_checks_only_when_asked() {
        let mut module = module_with(|_, body| {
            let root = body.nop();
            body.set_root(root);
        });
        let f = Func::new(0);
        module.add_export("f", ExportKind::Func(f));
        module.add_export("f", ExportKind::Func(f));
        assert_eq!(module.validate(false), Ok(()));
        assert!(module.validate(true).is_err());
    }

    #[test]
    fn start_function_must_take_nothing() {
        let mut module = module_with(|_, body| {
            let root = body.nop();
            body.set_root(root);
        });
        module.start_func = Some(Func::new(0));
        assert!(module.validate(true).is_err());
    }
}

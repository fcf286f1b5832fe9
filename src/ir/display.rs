//! Displaying IR.

use super::{Expr, ExprData, ExportKind, FuncDecl, FunctionBody, Module};
use crate::entity::EntityRef;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// One line per expression, in tree order, indented by depth.
pub struct FunctionBodyDisplay<'a>(pub(crate) &'a FunctionBody, pub(crate) &'a str);

impl FunctionBody {
    pub fn display<'a>(&'a self, indent: &'a str) -> FunctionBodyDisplay<'a> {
        FunctionBodyDisplay(self, indent)
    }
}

struct Head<'a>(&'a ExprData);

impl<'a> Display for Head<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.0 {
            ExprData::Block(b) => match b.label {
                Some(label) => write!(f, "block {}", label),
                None => write!(f, "block"),
            },
            ExprData::Loop(l) => write!(f, "loop {}", l.label),
            ExprData::Break(b) => write!(f, "{} {}", self.0.kind_name(), b.label),
            ExprData::Switch(s) => {
                let targets = s
                    .targets
                    .iter()
                    .map(|label| format!("{}", label))
                    .collect::<Vec<_>>();
                write!(f, "br_table [{}] {}", targets.join(", "), s.default)
            }
            ExprData::Call(c) => write!(f, "call {}", c.target),
            ExprData::CallIndirect(c) => write!(f, "call_indirect {}", c.sig),
            ExprData::LocalGet(g) => write!(f, "local.get {}", g.local),
            ExprData::LocalSet(s) => write!(f, "{} {}", self.0.kind_name(), s.local),
            ExprData::GlobalGet(g) => write!(f, "global.get {}", g.global),
            ExprData::GlobalSet(s) => write!(f, "global.set {}", s.global),
            ExprData::Load(l) => write!(
                f,
                "{}.load{} offset={} align={}",
                l.ty,
                l.bytes as u32 * 8,
                l.memarg.offset,
                l.memarg.align
            ),
            ExprData::Store(s) => write!(
                f,
                "{}.store{} offset={} align={}",
                s.ty,
                s.bytes as u32 * 8,
                s.memarg.offset,
                s.memarg.align
            ),
            ExprData::Const(value) => write!(f, "{}", value),
            ExprData::Unary(u) => write!(f, "{}", u.op.name()),
            ExprData::Binary(b) => write!(f, "{}", b.op.name()),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

impl<'a> Display for FunctionBodyDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let body = self.0;
        let arg_tys = body
            .locals
            .values()
            .take(body.n_params)
            .map(|&ty| format!("{}", ty))
            .collect::<Vec<_>>();
        let ret_tys = body
            .results
            .iter()
            .map(|&ty| format!("{}", ty))
            .collect::<Vec<_>>();
        writeln!(
            f,
            "{}function({}) -> {} {{",
            self.1,
            arg_tys.join(", "),
            ret_tys.join(", ")
        )?;
        for (local, ty) in body.locals.entries().skip(body.n_params) {
            writeln!(f, "{}  # {}: {}", self.1, local, ty)?;
        }

        if body.root.is_valid() {
            let mut stack: Vec<(Expr, usize)> = vec![(body.root, 1)];
            while let Some((expr, depth)) = stack.pop() {
                writeln!(
                    f,
                    "{}{:width$}{}: {}",
                    self.1,
                    "",
                    expr,
                    Head(&body[expr]),
                    width = depth * 2
                )?;
                for child in body[expr].children().into_iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }

        write!(f, "{}}}", self.1)
    }
}

pub struct ModuleDisplay<'a>(pub(crate) &'a Module);

impl<'a> Display for ModuleDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "module {{")?;
        for (sig, data) in self.0.signatures.entries() {
            let params = data
                .params
                .iter()
                .map(|&ty| format!("{}", ty))
                .collect::<Vec<_>>();
            let results = data
                .results
                .iter()
                .map(|&ty| format!("{}", ty))
                .collect::<Vec<_>>();
            writeln!(
                f,
                "  {}: ({}) -> ({})",
                sig,
                params.join(", "),
                results.join(", ")
            )?;
        }
        for (global, data) in self.0.globals.entries() {
            writeln!(
                f,
                "  {}: {}{} = {} # {}",
                global,
                if data.mutable { "mut " } else { "" },
                data.ty,
                data.init,
                data.name
            )?;
        }
        for (func, func_decl) in self.0.funcs.entries() {
            match func_decl {
                FuncDecl::Body(sig, name, body) => {
                    writeln!(f, "  {} \"{}\": {} =", func, name, sig)?;
                    writeln!(f, "{}", body.display("    "))?;
                }
                FuncDecl::Import(sig, name) => {
                    writeln!(f, "  {} \"{}\": {} = import", func, name, sig)?;
                }
            }
        }
        for export in &self.0.exports {
            let kind = match export.kind {
                ExportKind::Func(_) => "func",
                ExportKind::Global(_) => "global",
            };
            writeln!(f, "  export \"{}\": {} {}", export.name, kind, export.kind)?;
        }
        if let Some(start) = self.0.start_func {
            writeln!(f, "  start: {}", start)?;
        }
        writeln!(f, "}}")?;
        Ok(())
    }
}

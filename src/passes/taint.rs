//! Taint analysis.
//!
//! Tracks which values may carry data returned by a *source* function
//! and reports when such a value is passed to a *sink* function.
//! Sources and sinks are the functions exported under two reserved
//! names. Only the start function is analyzed, in a single forward walk
//! over its CFG; taint carried around a loop back-edge is not
//! propagated into blocks that were already walked.

use crate::cfg::{walk_function, BasicBlock, Cfg, CfgVisitor, CfgWalker};
use crate::ir::walk::Visitor;
use crate::ir::*;
use crate::pass::{Lattice, ModulePass, PassOptions, UnionSet};
use fxhash::FxHashSet;
use std::fmt;

pub const DEFAULT_SOURCE_EXPORT: &str = "taint_source";
pub const DEFAULT_SINK_EXPORT: &str = "taint_sink";
/// Pass argument overriding the source export name.
pub const SOURCE_ARGUMENT: &str = "taint-source";
/// Pass argument overriding the sink export name.
pub const SINK_ARGUMENT: &str = "taint-sink";

/// What is tainted at a point in a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaintState {
    pub exprs: UnionSet<Expr>,
    pub locals: UnionSet<Local>,
    pub globals: UnionSet<Global>,
    /// Keyed by a memory access's static offset plus alignment.
    pub memory: UnionSet<u64>,
}

impl Lattice for TaintState {
    fn top() -> Self {
        TaintState::default()
    }

    fn meet_with(&mut self, other: &TaintState) -> bool {
        let exprs = self.exprs.meet_with(&other.exprs);
        let locals = self.locals.meet_with(&other.locals);
        let globals = self.globals.meet_with(&other.globals);
        let memory = self.memory.meet_with(&other.memory);
        exprs || locals || globals || memory
    }
}

fn memory_key(memarg: MemArg) -> u64 {
    memarg.offset.wrapping_add(memarg.align as u64)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaintEvent {
    Walking(Func),
    Block(BasicBlock),
    Join { from: BasicBlock, to: BasicBlock },
    LocalRead(Local),
    LocalTainted(Local),
    LocalOverwritten(Local),
    GlobalRead(Global),
    GlobalTainted(Global),
    GlobalOverwritten(Global),
    MemoryRead(u64),
    MemoryTainted(u64),
    MemoryOverwritten(u64),
    Source(Expr),
    SinkReached { call: Expr, operand: Expr },
    CallArgument { call: Expr, target: Func },
    IndirectCallArgument(Expr),
    Select(Expr),
    Binary(Expr, BinaryOp),
    Unary(Expr, UnaryOp),
}

impl TaintEvent {
    /// Block and edge bookkeeping, as opposed to taint moving.
    pub fn is_bookkeeping(&self) -> bool {
        matches!(self, TaintEvent::Block(_) | TaintEvent::Join { .. })
    }
}

impl fmt::Display for TaintEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaintEvent::Walking(func) => write!(f, "Walking {}", func),
            TaintEvent::Block(block) => write!(f, "Block: {}", block),
            TaintEvent::Join { from, to } => {
                write!(f, "> Joining {} (out) to {} (in)", from, to)
            }
            TaintEvent::LocalRead(local) => write!(f, "  Loading tainted {}", local),
            TaintEvent::LocalTainted(local) => write!(f, "  Setting taint to {}", local),
            TaintEvent::LocalOverwritten(local) => write!(f, "  Overwriting taint at {}", local),
            TaintEvent::GlobalRead(global) => write!(f, "  Loading tainted {}", global),
            TaintEvent::GlobalTainted(global) => write!(f, "  Setting taint to {}", global),
            TaintEvent::GlobalOverwritten(global) => {
                write!(f, "  Overwriting taint at {}", global)
            }
            TaintEvent::MemoryRead(addr) => {
                write!(f, "  Loading tainted memory at address {}", addr)
            }
            TaintEvent::MemoryTainted(addr) => {
                write!(f, "  Storing taint at memory address {}", addr)
            }
            TaintEvent::MemoryOverwritten(addr) => {
                write!(f, "  Overwriting taint at memory address {}", addr)
            }
            TaintEvent::Source(call) => write!(f, "  [Taint source detected] at {}", call),
            TaintEvent::SinkReached { call, operand } => {
                write!(f, "  [Taint has reached a sink] {} via {}", call, operand)
            }
            TaintEvent::CallArgument { call, target } => {
                write!(f, "  Tainted value passed to {} at {}", target, call)
            }
            TaintEvent::IndirectCallArgument(call) => {
                write!(f, "  Tainted value passed to an indirect call at {}", call)
            }
            TaintEvent::Select(expr) => write!(f, "  Tainted select at {}", expr),
            TaintEvent::Binary(expr, op) => {
                write!(f, "  Tainted value in {} at {}", op.name(), expr)
            }
            TaintEvent::Unary(expr, op) => {
                write!(f, "  Tainted value in {} at {}", op.name(), expr)
            }
        }
    }
}

/// The outcome of analyzing one function.
#[derive(Clone, Debug, Default)]
pub struct TaintReport {
    /// The function that was walked, if there was one.
    pub func: Option<Func>,
    pub events: Vec<TaintEvent>,
    /// The function's CFG with each block's final taint state.
    pub cfg: Cfg<TaintState>,
}

impl TaintReport {
    /// `(call, operand)` for every tainted operand passed to a sink.
    pub fn sink_hits(&self) -> Vec<(Expr, Expr)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TaintEvent::SinkReached { call, operand } => Some((*call, *operand)),
                _ => None,
            })
            .collect()
    }

    /// Whether `expr` was tainted when it was evaluated.
    pub fn is_tainted(&self, expr: Expr) -> bool {
        self.cfg
            .block_of(expr)
            .map(|block| self.cfg[block].contents.exprs.contains(&expr))
            .unwrap_or(false)
    }
}

struct TaintWalker {
    walker: CfgWalker<TaintState>,
    sources: FxHashSet<Func>,
    sinks: FxHashSet<Func>,
    events: Vec<TaintEvent>,
}

impl TaintWalker {
    fn emit(&mut self, event: TaintEvent) {
        if event.is_bookkeeping() {
            log::debug!("{}", event);
        } else {
            log::info!("{}", event);
        }
        self.events.push(event);
    }

    fn state(&mut self) -> &mut TaintState {
        self.walker.contents_mut()
    }

    fn tainted(&self, expr: Expr) -> bool {
        self.walker.contents().exprs.contains(&expr)
    }

    fn taint(&mut self, expr: Expr) {
        self.state().exprs.add(expr);
    }
}

impl Visitor for TaintWalker {
    fn visit_local_get(&mut self, expr: Expr, curr: &LocalGet) {
        if self.walker.contents().locals.contains(&curr.local) {
            self.taint(expr);
            self.emit(TaintEvent::LocalRead(curr.local));
        }
    }

    fn visit_local_set(&mut self, expr: Expr, curr: &LocalSet) {
        if self.tainted(curr.value) {
            self.state().locals.add(curr.local);
            if curr.tee {
                self.taint(expr);
            }
            self.emit(TaintEvent::LocalTainted(curr.local));
        } else if self.state().locals.remove(&curr.local) {
            self.emit(TaintEvent::LocalOverwritten(curr.local));
        }
    }

    fn visit_global_get(&mut self, expr: Expr, curr: &GlobalGet) {
        if self.walker.contents().globals.contains(&curr.global) {
            self.taint(expr);
            self.emit(TaintEvent::GlobalRead(curr.global));
        }
    }

    fn visit_global_set(&mut self, _expr: Expr, curr: &GlobalSet) {
        if self.tainted(curr.value) {
            self.state().globals.add(curr.global);
            self.emit(TaintEvent::GlobalTainted(curr.global));
        } else if self.state().globals.remove(&curr.global) {
            self.emit(TaintEvent::GlobalOverwritten(curr.global));
        }
    }

    fn visit_load(&mut self, expr: Expr, curr: &Load) {
        let addr = memory_key(curr.memarg);
        if self.walker.contents().memory.contains(&addr) {
            self.taint(expr);
            self.emit(TaintEvent::MemoryRead(addr));
        }
    }

    fn visit_store(&mut self, _expr: Expr, curr: &Store) {
        let addr = memory_key(curr.memarg);
        if self.tainted(curr.value) {
            self.state().memory.add(addr);
            self.emit(TaintEvent::MemoryTainted(addr));
        } else if self.state().memory.remove(&addr) {
            self.emit(TaintEvent::MemoryOverwritten(addr));
        }
    }

    fn visit_select(&mut self, expr: Expr, curr: &Select) {
        if [curr.if_true, curr.if_false, curr.condition]
            .iter()
            .any(|&operand| self.tainted(operand))
        {
            self.taint(expr);
            self.emit(TaintEvent::Select(expr));
        }
    }

    fn visit_call(&mut self, expr: Expr, curr: &Call) {
        if self.sources.contains(&curr.target) {
            self.taint(expr);
            self.emit(TaintEvent::Source(expr));
        }
        if self.sinks.contains(&curr.target) {
            for &operand in &curr.operands {
                if self.tainted(operand) {
                    self.emit(TaintEvent::SinkReached {
                        call: expr,
                        operand,
                    });
                }
            }
        }
        if curr.operands.iter().any(|&operand| self.tainted(operand)) {
            self.taint(expr);
            self.emit(TaintEvent::CallArgument {
                call: expr,
                target: curr.target,
            });
        }
    }

    fn visit_call_indirect(&mut self, expr: Expr, curr: &CallIndirect) {
        // The callee is not known, so it cannot be checked against the
        // sources and sinks.
        let tainted = curr
            .operands
            .iter()
            .chain(std::iter::once(&curr.target))
            .any(|&operand| self.tainted(operand));
        if tainted {
            self.taint(expr);
            self.emit(TaintEvent::IndirectCallArgument(expr));
        }
    }

    fn visit_binary(&mut self, expr: Expr, curr: &Binary) {
        if self.tainted(curr.left) || self.tainted(curr.right) {
            self.taint(expr);
            self.emit(TaintEvent::Binary(expr, curr.op));
        }
    }

    fn visit_unary(&mut self, expr: Expr, curr: &Unary) {
        if self.tainted(curr.value) {
            self.taint(expr);
            self.emit(TaintEvent::Unary(expr, curr.op));
        }
    }
}

impl CfgVisitor for TaintWalker {
    type Contents = TaintState;

    fn walker(&mut self) -> &mut CfgWalker<TaintState> {
        &mut self.walker
    }

    fn start_basic_block(&mut self, block: BasicBlock) {
        self.emit(TaintEvent::Block(block));
    }

    fn link(&mut self, from: BasicBlock, to: BasicBlock) {
        self.emit(TaintEvent::Join { from, to });
        self.walker.cfg.join_edge(from, to);
    }
}

pub struct TaintAnalysis;

impl TaintAnalysis {
    /// Analyze the start function of `module`.
    pub fn run(module: &Module, options: &PassOptions) -> TaintReport {
        let source_name = options.get_argument_or_default(SOURCE_ARGUMENT, DEFAULT_SOURCE_EXPORT);
        let sink_name = options.get_argument_or_default(SINK_ARGUMENT, DEFAULT_SINK_EXPORT);
        let sources: FxHashSet<Func> = module.exported_funcs(source_name).collect();
        let sinks: FxHashSet<Func> = module.exported_funcs(sink_name).collect();
        if sources.is_empty() {
            log::warn!("taint: no taint sources (no function exported as \"{}\")", source_name);
        }
        if sinks.is_empty() {
            log::warn!("taint: no taint sinks (no function exported as \"{}\")", sink_name);
        }

        let mut walker = TaintWalker {
            walker: CfgWalker::new(),
            sources,
            sinks,
            events: vec![],
        };

        let start = match module.start_func {
            Some(start) => start,
            None => {
                log::warn!("taint: module has no start function, nothing to analyze");
                return TaintReport::default();
            }
        };
        let body = match module.funcs.get(start).and_then(|decl| decl.body()) {
            Some(body) => body,
            None => {
                log::warn!("taint: start function {} has no body", start);
                return TaintReport::default();
            }
        };

        walker.emit(TaintEvent::Walking(start));
        walk_function(&mut walker, body);

        TaintReport {
            func: Some(start),
            events: walker.events,
            cfg: walker.walker.take_cfg(),
        }
    }
}

/// The `taint` pass: runs [`TaintAnalysis`] and keeps the report from
/// its most recent run.
#[derive(Debug, Default)]
pub struct Taint {
    report: Option<TaintReport>,
}

impl Taint {
    pub fn report(&self) -> Option<&TaintReport> {
        self.report.as_ref()
    }
}

impl ModulePass for Taint {
    fn run(&mut self, options: &PassOptions, module: &mut Module) -> anyhow::Result<()> {
        let report = TaintAnalysis::run(module, options);
        log::info!(
            "taint: {} events, {} sink hits",
            report.events.len(),
            report.sink_hits().len()
        );
        self.report = Some(report);
        Ok(())
    }

    fn modifies_ir(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn no_start_function_walks_nothing() {
        let _ = env_logger::try_init();
        let module = Module::empty();
        let report = TaintAnalysis::run(&module, &PassOptions::default());
        assert!(report.func.is_none());
        assert!(report.events.is_empty());
        assert!(report.cfg.is_empty());
    }

    #[test]
    fn tee_taints_its_result() {
        let _ = env_logger::try_init();
        let mut module = Module::empty();
        let void = module.add_signature(vec![], vec![]);
        let source_sig = module.add_signature(vec![], vec![Type::I32]);
        let source = module.add_import("source", source_sig);
        module.add_export(DEFAULT_SOURCE_EXPORT, ExportKind::Func(source));

        let mut body = FunctionBody::new(&module, void);
        let local = body.add_local(Type::I32);
        let call = body.call(source, vec![]);
        let tee = body.local_tee(local, call);
        let drop = body.drop_(tee);
        body.set_root(drop);
        let start = module.add_func("start", void, body);
        module.start_func = Some(start);

        let report = TaintAnalysis::run(&module, &PassOptions::default());
        assert_eq!(report.func, Some(start));
        assert!(report.is_tainted(call));
        assert!(report.is_tainted(tee));
        assert!(!report.is_tainted(drop));
        assert_eq!(
            report.events,
            vec![
                TaintEvent::Walking(start),
                TaintEvent::Block(BasicBlock::new(0)),
                TaintEvent::Source(call),
                TaintEvent::LocalTainted(local),
            ]
        );
    }

    #[test]
    fn renamed_sentinels() {
        let mut module = Module::empty();
        let void = module.add_signature(vec![], vec![]);
        let source_sig = module.add_signature(vec![], vec![Type::I32]);
        let source = module.add_import("source", source_sig);
        module.add_export("user_input", ExportKind::Func(source));
        let mut body = FunctionBody::new(&module, void);
        let call = body.call(source, vec![]);
        let drop = body.drop_(call);
        body.set_root(drop);
        module.start_func = Some(module.add_func("start", void, body));

        let report = TaintAnalysis::run(&module, &PassOptions::default());
        assert!(!report.is_tainted(call));

        let mut options = PassOptions::default();
        options.set_argument(SOURCE_ARGUMENT, "user_input");
        let report = TaintAnalysis::run(&module, &options);
        assert!(report.is_tainted(call));
    }

    #[test]
    fn select_condition_taints() {
        let mut module = Module::empty();
        let void = module.add_signature(vec![], vec![]);
        let source_sig = module.add_signature(vec![], vec![Type::I32]);
        let source = module.add_import("source", source_sig);
        module.add_export(DEFAULT_SOURCE_EXPORT, ExportKind::Func(source));
        let mut body = FunctionBody::new(&module, void);
        let a = body.i32_const(1);
        let b = body.i32_const(2);
        let c = body.call(source, vec![]);
        let select = body.select(a, b, c);
        let drop = body.drop_(select);
        body.set_root(drop);
        module.start_func = Some(module.add_func("start", void, body));

        let report = TaintAnalysis::run(&module, &PassOptions::default());
        assert!(report.is_tainted(select));
        assert!(!report.is_tainted(a));
    }
}

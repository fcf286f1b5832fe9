//! Building a CFG during a single forward walk.

use super::{BasicBlock, Cfg};
use crate::entity::EntityRef;
use crate::ir::walk::Visitor;
use crate::ir::{Expr, ExprData, FunctionBody, Label};
use crate::pass::FlowMode;
use fxhash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Debug;

/// Block-tracking state embedded in every [`CfgVisitor`].
#[derive(Debug)]
pub struct CfgWalker<C: Clone + Debug> {
    pub cfg: Cfg<C>,
    current: BasicBlock,
    /// Condition blocks of open `if`s, followed by the end of the true
    /// arm once the false arm has started.
    if_stack: Vec<BasicBlock>,
    loop_tops: Vec<BasicBlock>,
    /// Blocks that end in a branch to each label, not yet resolved.
    branches: FxHashMap<Label, SmallVec<[BasicBlock; 4]>>,
    pub mode: FlowMode,
}

impl<C: Clone + Debug> Default for CfgWalker<C> {
    fn default() -> Self {
        CfgWalker {
            cfg: Cfg::default(),
            current: BasicBlock::invalid(),
            if_stack: vec![],
            loop_tops: vec![],
            branches: FxHashMap::default(),
            mode: FlowMode::SinglePass,
        }
    }
}

impl<C: Clone + Debug + Default> CfgWalker<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block expressions are currently being placed in.
    pub fn current(&self) -> BasicBlock {
        self.current
    }

    /// Whether the current block can be entered. Node hooks are not
    /// called while it cannot.
    pub fn is_reachable(&self) -> bool {
        self.cfg[self.current].reachable
    }

    pub fn contents(&self) -> &C {
        &self.cfg[self.current].contents
    }

    pub fn contents_mut(&mut self) -> &mut C {
        &mut self.cfg[self.current].contents
    }

    /// Hand over the finished graph, leaving an empty one behind.
    pub fn take_cfg(&mut self) -> Cfg<C> {
        std::mem::take(&mut self.cfg)
    }

    fn reset(&mut self) {
        let mode = self.mode;
        *self = CfgWalker {
            mode,
            ..CfgWalker::default()
        };
    }
}

/// A [`Visitor`] that also tracks basic blocks.
///
/// The typed node hooks from `Visitor` run with the node's block
/// current, so they can read and update `walker().contents_mut()`.
/// They are not called for nodes in unreachable blocks.
pub trait CfgVisitor: Visitor {
    type Contents: Clone + Debug + Default;

    fn walker(&mut self) -> &mut CfgWalker<Self::Contents>;

    /// Called when a new block becomes current, before any edge into it
    /// is added.
    fn start_basic_block(&mut self, _block: BasicBlock) {}

    /// Called once for every new edge, after the edge is recorded.
    /// Edges are only recorded out of reachable blocks.
    fn link(&mut self, _from: BasicBlock, _to: BasicBlock) {}
}

#[derive(Clone, Copy, Debug)]
enum Task {
    Scan(Expr),
    Visit(Expr),
    StartIfTrue,
    StartIfFalse,
    EndIf(bool),
    StartLoop,
    EndLoop(Label),
    EndBlock(Option<Label>),
    EndBreak(Expr),
    EndSwitch(Expr),
    StartUnreachable,
}

fn start_block<V: CfgVisitor>(visitor: &mut V) -> BasicBlock {
    let walker = visitor.walker();
    let block = walker.cfg.add_block();
    walker.current = block;
    log::trace!("start_block: {}", block);
    visitor.start_basic_block(block);
    block
}

fn link<V: CfgVisitor>(visitor: &mut V, from: BasicBlock, to: BasicBlock) {
    let cfg = &mut visitor.walker().cfg;
    if !cfg[from].reachable {
        log::trace!("link: {} -> {} skipped, {} is unreachable", from, to, from);
        return;
    }
    if cfg.add_edge(from, to) {
        cfg[to].reachable = true;
        log::trace!("link: {} -> {}", from, to);
        visitor.link(from, to);
    }
}

/// Start a new block reached by fallthrough from the current one.
fn start_linked_block<V: CfgVisitor>(visitor: &mut V) -> BasicBlock {
    let last = visitor.walker().current;
    let block = start_block(visitor);
    link(visitor, last, block);
    block
}

fn scan(body: &FunctionBody, expr: Expr, tasks: &mut Vec<Task>) {
    // Tasks are pushed in reverse of the order they run.
    match &body[expr] {
        ExprData::If(i) => {
            tasks.push(Task::Visit(expr));
            tasks.push(Task::EndIf(i.if_false.is_some()));
            if let Some(if_false) = i.if_false {
                tasks.push(Task::Scan(if_false));
                tasks.push(Task::StartIfFalse);
            }
            tasks.push(Task::Scan(i.if_true));
            tasks.push(Task::StartIfTrue);
            tasks.push(Task::Scan(i.condition));
            return;
        }
        ExprData::Loop(l) => {
            tasks.push(Task::Visit(expr));
            tasks.push(Task::EndLoop(l.label));
            tasks.push(Task::Scan(l.body));
            tasks.push(Task::StartLoop);
            return;
        }
        ExprData::Block(b) => {
            tasks.push(Task::Visit(expr));
            tasks.push(Task::EndBlock(b.label));
        }
        ExprData::Break(_) => {
            tasks.push(Task::EndBreak(expr));
            tasks.push(Task::Visit(expr));
        }
        ExprData::Switch(_) => {
            tasks.push(Task::EndSwitch(expr));
            tasks.push(Task::Visit(expr));
        }
        ExprData::Return(_) | ExprData::Unreachable => {
            tasks.push(Task::StartUnreachable);
            tasks.push(Task::Visit(expr));
        }
        _ => {
            tasks.push(Task::Visit(expr));
        }
    }
    for child in body[expr].children().into_iter().rev() {
        tasks.push(Task::Scan(child));
    }
}

/// Walk `body` once in post-order, splitting it into basic blocks and
/// calling the visitor's node hooks with each node's block current.
///
/// Every node is placed in exactly one block. Code following an
/// unconditional transfer lands in an unreachable block: it gets no
/// incoming edges, its nodes are not visited, and edges out of it are
/// dropped. Back-edges into a loop head are added when the loop ends;
/// the head block is not revisited afterwards.
pub fn walk_function<V: CfgVisitor>(visitor: &mut V, body: &FunctionBody) {
    visitor.walker().reset();
    let entry = start_block(visitor);
    let walker = visitor.walker();
    walker.cfg.entry = entry;
    walker.cfg[entry].reachable = true;

    let mut tasks: Vec<Task> = vec![];
    if body.root.is_valid() {
        tasks.push(Task::Scan(body.root));
    }

    while let Some(task) = tasks.pop() {
        match task {
            Task::Scan(expr) => scan(body, expr, &mut tasks),
            Task::Visit(expr) => {
                let walker = visitor.walker();
                let current = walker.current;
                walker.cfg[current].exprs.push(expr);
                if walker.cfg[current].reachable {
                    visitor.visit_expr(body, expr);
                }
            }
            Task::StartIfTrue => {
                let condition_block = visitor.walker().current;
                start_linked_block(visitor);
                visitor.walker().if_stack.push(condition_block);
            }
            Task::StartIfFalse => {
                let walker = visitor.walker();
                let true_end = walker.current;
                let condition_block = *walker
                    .if_stack
                    .last()
                    .expect("if_stack holds the condition block");
                walker.if_stack.push(true_end);
                let block = start_block(visitor);
                link(visitor, condition_block, block);
            }
            Task::EndIf(has_else) => {
                let merge = start_linked_block(visitor);
                let walker = visitor.walker();
                let true_end = if has_else {
                    walker.if_stack.pop()
                } else {
                    None
                };
                let condition_block = walker
                    .if_stack
                    .pop()
                    .expect("if_stack holds the condition block");
                match true_end {
                    Some(true_end) => link(visitor, true_end, merge),
                    None => link(visitor, condition_block, merge),
                }
            }
            Task::StartLoop => {
                let top = start_linked_block(visitor);
                visitor.walker().loop_tops.push(top);
            }
            Task::EndLoop(label) => {
                start_linked_block(visitor);
                let walker = visitor.walker();
                let top = walker.loop_tops.pop().expect("loop_tops holds the loop head");
                let origins = walker.branches.remove(&label).unwrap_or_default();
                let mode = walker.mode;
                match mode {
                    FlowMode::SinglePass => {
                        // The head is already finished; the back-edges
                        // only join into its stored contents.
                        for origin in origins {
                            link(visitor, origin, top);
                        }
                    }
                }
            }
            Task::EndBlock(label) => {
                let origins = label.and_then(|label| visitor.walker().branches.remove(&label));
                if let Some(origins) = origins {
                    let block = start_linked_block(visitor);
                    for origin in origins {
                        link(visitor, origin, block);
                    }
                }
            }
            Task::EndBreak(expr) => {
                let (label, conditional) = match &body[expr] {
                    ExprData::Break(b) => (b.label, b.condition.is_some()),
                    _ => unreachable!(),
                };
                let walker = visitor.walker();
                let current = walker.current;
                walker.branches.entry(label).or_default().push(current);
                if conditional {
                    start_linked_block(visitor);
                } else {
                    start_block(visitor);
                }
            }
            Task::EndSwitch(expr) => {
                let walker = visitor.walker();
                let current = walker.current;
                if let ExprData::Switch(s) = &body[expr] {
                    let mut seen: SmallVec<[Label; 8]> = SmallVec::new();
                    for &target in s.targets.iter().chain(std::iter::once(&s.default)) {
                        if !seen.contains(&target) {
                            seen.push(target);
                            walker.branches.entry(target).or_default().push(current);
                        }
                    }
                }
                start_block(visitor);
            }
            Task::StartUnreachable => {
                start_block(visitor);
            }
        }
    }

    let walker = visitor.walker();
    walker.cfg.exit = walker.current;
    log::debug!(
        "walk_function: {} blocks, {} edges",
        walker.cfg.len(),
        walker.cfg.edge_count()
    );
}

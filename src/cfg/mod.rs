//! Control-flow graphs over expression trees.
//!
//! A [`Cfg`] splits a function body into basic blocks: maximal runs of
//! expressions, in execution order, that control enters only at the
//! top. Each block carries analysis-defined `contents`. Graphs are
//! built by [`walk_function`], which drives a [`CfgVisitor`] over the
//! body in one forward pass.

use crate::declare_entity;
use crate::entity::{EntityRef, EntityVec};
use crate::ir::Expr;
use smallvec::SmallVec;
use std::fmt::Debug;

mod walker;
pub use walker::*;

declare_entity!(BasicBlock, "bb");

#[derive(Clone, Debug, Default)]
pub struct BasicBlockData<C> {
    /// Expressions in this block, in the order they were visited.
    pub exprs: Vec<Expr>,
    /// Analysis state for this block.
    pub contents: C,
    /// Whether control can enter this block. Blocks that only follow
    /// an unconditional transfer, or whose only predecessors are such
    /// blocks, are unreachable: their expressions are placed but never
    /// visited, and no edges leave them.
    pub reachable: bool,
    pub preds: SmallVec<[BasicBlock; 4]>,
    pub succs: SmallVec<[BasicBlock; 4]>,
}

#[derive(Clone, Debug)]
pub struct Cfg<C: Clone + Debug> {
    pub blocks: EntityVec<BasicBlock, BasicBlockData<C>>,
    /// Block control enters the function at.
    pub entry: BasicBlock,
    /// Block that was current when the walk finished.
    pub exit: BasicBlock,
}

impl<C: Clone + Debug> Default for Cfg<C> {
    fn default() -> Self {
        Cfg {
            blocks: EntityVec::default(),
            entry: BasicBlock::invalid(),
            exit: BasicBlock::invalid(),
        }
    }
}

impl<C: Clone + Debug + Default> Cfg<C> {
    pub fn add_block(&mut self) -> BasicBlock {
        self.blocks.push(BasicBlockData::default())
    }
}

impl<C: Clone + Debug> Cfg<C> {
    /// Record the edge `from -> to`. Returns `false` if the edge
    /// already existed.
    pub fn add_edge(&mut self, from: BasicBlock, to: BasicBlock) -> bool {
        if self.blocks[from].succs.contains(&to) {
            return false;
        }
        self.blocks[from].succs.push(to);
        self.blocks[to].preds.push(from);
        true
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block an expression was placed in, if it was visited.
    pub fn block_of(&self, expr: Expr) -> Option<BasicBlock> {
        self.blocks
            .entries()
            .find(|(_, data)| data.exprs.contains(&expr))
            .map(|(block, _)| block)
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.blocks.values().map(|data| data.succs.len()).sum()
    }
}

impl<C: Clone + Debug> std::ops::Index<BasicBlock> for Cfg<C> {
    type Output = BasicBlockData<C>;
    fn index(&self, block: BasicBlock) -> &BasicBlockData<C> {
        &self.blocks[block]
    }
}

impl<C: Clone + Debug> std::ops::IndexMut<BasicBlock> for Cfg<C> {
    fn index_mut(&mut self, block: BasicBlock) -> &mut BasicBlockData<C> {
        &mut self.blocks[block]
    }
}

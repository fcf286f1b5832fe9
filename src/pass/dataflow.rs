//! Merging analysis state across CFG edges.

use crate::cfg::{BasicBlock, Cfg};
use crate::pass::Lattice;

/// How block contents flow through a CFG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlowMode {
    /// Contents are merged into a block once, as each incoming edge is
    /// discovered during the forward walk. Blocks that are already
    /// complete when a back-edge reaches them are not revisited, so
    /// facts carried around a loop may be missed.
    SinglePass,
}

impl Default for FlowMode {
    fn default() -> Self {
        FlowMode::SinglePass
    }
}

impl<C: Lattice> Cfg<C> {
    /// Meet the contents of `from` into `to`. Returns `true` if `to`
    /// changed.
    pub fn join_edge(&mut self, from: BasicBlock, to: BasicBlock) -> bool {
        if from == to {
            return false;
        }
        let incoming = self[from].contents.clone();
        self[to].contents.meet_with(&incoming)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pass::UnionSet;

    #[test]
    fn join_unions_into_target() {
        let mut cfg: Cfg<UnionSet<u32>> = Cfg::default();
        let a = cfg.add_block();
        let b = cfg.add_block();
        let c = cfg.add_block();
        cfg[a].contents.add(1);
        cfg[b].contents.add(2);
        assert!(cfg.join_edge(a, c));
        assert!(cfg.join_edge(b, c));
        assert!(!cfg.join_edge(a, c));
        assert!(cfg[c].contents.contains(&1));
        assert!(cfg[c].contents.contains(&2));
        assert_eq!(cfg[a].contents.len(), 1);
    }
}

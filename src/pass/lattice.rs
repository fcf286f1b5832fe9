//! Lattice trait definition and a set lattice for may-analyses.

use fxhash::FxHashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// A lattice type used for an analysis.
///
/// The `meet` operator must compute the greatest lower bound for its
/// operands. It must obey the usual lattice laws:
///
/// * a `meet` a == a  (idempotence)
/// * a `meet` b == b `meet` a (commutativity)
/// * a `meet` (b `meet` c) == (a `meet` b) `meet` c (associativity)
/// * a `meet` top == a
///
/// Analyses here run a single forward pass, so the lattice is not
/// required to have finite height.
pub trait Lattice: Clone + Debug {
    /// Return the `top` lattice value.
    fn top() -> Self;
    /// Mutate self to `meet(self, other)`. Returns `true` if any
    /// changes occurred.
    fn meet_with(&mut self, other: &Self) -> bool;
}

/// An analysis-value lattice whose values are sets of entities. `top`
/// is empty and the `meet` function is a union. This is useful for
/// may-analyses, i.e. when an analysis computes whether a property
/// *may* be true about a value in some case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnionSet<T: Hash + Eq> {
    set: FxHashSet<T>,
}

impl<T: Hash + Eq> Default for UnionSet<T> {
    fn default() -> Self {
        UnionSet {
            set: FxHashSet::default(),
        }
    }
}

impl<T: Clone + Debug + Hash + Eq> Lattice for UnionSet<T> {
    fn top() -> Self {
        Self::default()
    }

    fn meet_with(&mut self, other: &UnionSet<T>) -> bool {
        let before = self.set.len();
        self.set.extend(other.set.iter().cloned());
        self.set.len() != before
    }
}

impl<T: Hash + Eq> UnionSet<T> {
    pub fn contains(&self, elem: &T) -> bool {
        self.set.contains(elem)
    }

    /// Returns `true` if the element was not already present.
    pub fn add(&mut self, elem: T) -> bool {
        self.set.insert(elem)
    }

    /// Returns `true` if the element was present.
    pub fn remove(&mut self, elem: &T) -> bool {
        self.set.remove(elem)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.set.iter()
    }
}

impl<T: Hash + Eq> FromIterator<T> for UnionSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        UnionSet {
            set: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_meet() {
        let mut a: UnionSet<u32> = [1, 2].into_iter().collect();
        let b: UnionSet<u32> = [2, 3].into_iter().collect();
        assert!(a.meet_with(&b));
        assert!(!a.meet_with(&b));
        assert_eq!(a, [1, 2, 3].into_iter().collect());
        assert!(!a.meet_with(&UnionSet::top()));
    }
}

//! Handles into per-module and per-function arenas.
//!
//! Every IR object (a function, a global, an expression node, a basic
//! block) lives in an [`EntityVec`] owned by its module, function body
//! or CFG, and is named by a small `Copy` handle. Handles stay valid for
//! as long as their arena does; nothing is ever removed from one.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A handle into an arena. `invalid()` is reserved as the "no entity"
/// value and never names a real entry.
pub trait EntityRef: Copy + Eq + Ord + Hash {
    fn new(index: usize) -> Self;
    fn index(self) -> usize;
    fn invalid() -> Self;

    fn is_valid(self) -> bool {
        self != Self::invalid()
    }

    fn is_invalid(self) -> bool {
        !self.is_valid()
    }
}

/// Declare a handle type, printed as `<prefix><index>`:
///
/// ```
/// wasm_passes::declare_entity!(Node, "n");
/// use wasm_passes::entity::EntityRef;
/// assert_eq!(Node::new(3).to_string(), "n3");
/// assert!(Node::default().is_invalid());
/// ```
#[macro_export]
macro_rules! declare_entity {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(index: usize) -> Self {
                match u32::try_from(index) {
                    Ok(raw) if raw != u32::MAX => $name(raw),
                    _ => panic!("{} index {} out of range", stringify!($name), index),
                }
            }
            fn index(self) -> usize {
                self.0 as usize
            }
            fn invalid() -> Self {
                $name(u32::MAX)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <$name as $crate::entity::EntityRef>::invalid()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                if self.0 == u32::MAX {
                    write!(f, "{}<invalid>", $prefix)
                } else {
                    write!(f, "{}{}", $prefix, self.0)
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Display::fmt(self, f)
            }
        }
    };
}

/// An append-only arena whose entries are named by `Idx` handles.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityVec<Idx: EntityRef, T: Clone + Debug> {
    items: Vec<T>,
    _handle: PhantomData<Idx>,
}

impl<Idx: EntityRef, T: Clone + Debug> Default for EntityVec<Idx, T> {
    fn default() -> Self {
        Vec::new().into()
    }
}

impl<Idx: EntityRef, T: Clone + Debug> From<Vec<T>> for EntityVec<Idx, T> {
    fn from(items: Vec<T>) -> Self {
        EntityVec {
            items,
            _handle: PhantomData,
        }
    }
}

impl<Idx: EntityRef, T: Clone + Debug> EntityVec<Idx, T> {
    /// Add an entry; returns its handle.
    pub fn push(&mut self, item: T) -> Idx {
        let handle = Idx::new(self.items.len());
        self.items.push(item);
        handle
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, handle: Idx) -> bool {
        handle.is_valid() && handle.index() < self.items.len()
    }

    /// Handles of every entry, in creation order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Idx> {
        (0..self.items.len()).map(Idx::new)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Idx, &T)> {
        self.iter().zip(self.items.iter())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (Idx, &mut T)> {
        (0..self.items.len()).map(Idx::new).zip(self.items.iter_mut())
    }

    pub fn get(&self, handle: Idx) -> Option<&T> {
        if self.contains(handle) {
            Some(&self.items[handle.index()])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: Idx) -> Option<&mut T> {
        if self.contains(handle) {
            Some(&mut self.items[handle.index()])
        } else {
            None
        }
    }
}

impl<Idx: EntityRef, T: Clone + Debug> Index<Idx> for EntityVec<Idx, T> {
    type Output = T;
    fn index(&self, handle: Idx) -> &T {
        &self.items[handle.index()]
    }
}

impl<Idx: EntityRef, T: Clone + Debug> IndexMut<Idx> for EntityVec<Idx, T> {
    fn index_mut(&mut self, handle: Idx) -> &mut T {
        &mut self.items[handle.index()]
    }
}

/// Side-table data for entities that live in some other arena. Reads of
/// an entry that was never written see `T::default()`.
#[derive(Clone, Debug, Default)]
pub struct PerEntity<Idx: EntityRef, T: Clone + Debug + Default> {
    values: Vec<T>,
    default: T,
    _handle: PhantomData<Idx>,
}

impl<Idx: EntityRef, T: Clone + Debug + Default> Index<Idx> for PerEntity<Idx, T> {
    type Output = T;
    fn index(&self, handle: Idx) -> &T {
        self.values.get(handle.index()).unwrap_or(&self.default)
    }
}

impl<Idx: EntityRef, T: Clone + Debug + Default> IndexMut<Idx> for PerEntity<Idx, T> {
    fn index_mut(&mut self, handle: Idx) -> &mut T {
        let index = handle.index();
        if index >= self.values.len() {
            self.values.resize(index + 1, T::default());
        }
        &mut self.values[index]
    }
}

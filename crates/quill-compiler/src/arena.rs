//! Append-only node storage addressed by stable handles.
//!
//! Every table of the semantic model (expressions, statements, variables,
//! functions, overload sets, scopes, symbols, types) is an [`Arena`]. Nodes
//! are never removed; simplification replaces *handles* inside parents
//! instead. Reads clone an [`Arc`] out from under a shared lock so a worker
//! can hold a node without blocking writers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use quill_core::ModuleId;

/// A typed index into an [`Arena`].
pub trait ArenaId: Copy + Eq + std::hash::Hash + fmt::Debug {
    /// Build a handle from a raw index.
    fn from_index(index: usize) -> Self;
    /// The raw index of this handle.
    fn index(self) -> usize;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl ArenaId for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle of an analyzed expression.
    ExprId,
    "e"
);
define_id!(
    /// Handle of an analyzed statement.
    StmtId,
    "s"
);
define_id!(
    /// Handle of a variable.
    VarId,
    "v"
);
define_id!(
    /// Handle of a function.
    FunctionId,
    "f"
);
define_id!(
    /// Handle of an overload set.
    OverloadSetId,
    "o"
);
define_id!(
    /// Handle of a scope.
    ScopeId,
    "sc"
);
define_id!(
    /// Handle of a symbol.
    SymbolId,
    "sym"
);
define_id!(
    /// Handle of a type.
    TypeId,
    "t"
);

impl TypeId {
    /// The builtin `int32` type.
    pub const INT32: TypeId = TypeId(0);
    /// The builtin `bool` type.
    pub const BOOL: TypeId = TypeId(1);
    /// The builtin `void` type.
    pub const VOID: TypeId = TypeId(2);
    /// The type of type values.
    pub const TYPE: TypeId = TypeId(3);
}

impl ArenaId for ModuleId {
    fn from_index(index: usize) -> Self {
        ModuleId::new(index as u32)
    }

    fn index(self) -> usize {
        ModuleId::index(self) as usize
    }
}

/// Append-only storage guarded by a single [`RwLock`].
pub struct Arena<I, T> {
    items: RwLock<Vec<Arc<T>>>,
    _id: PhantomData<fn() -> I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            _id: PhantomData,
        }
    }

    /// Append a node and return its handle.
    pub fn push(&self, item: T) -> I {
        let mut items = self.items.write();
        items.push(Arc::new(item));
        I::from_index(items.len() - 1)
    }

    /// Get a node by handle.
    ///
    /// Handles are only minted by [`push`](Self::push), so every handle
    /// issued by this arena is in range.
    pub fn get(&self, id: I) -> Arc<T> {
        Arc::clone(&self.items.read()[id.index()])
    }

    /// Number of nodes stored.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Snapshot of all handles in allocation order.
    pub fn ids(&self) -> Vec<I> {
        (0..self.len()).map(I::from_index).collect()
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_stable() {
        let arena: Arena<ExprId, &str> = Arena::new();
        let a = arena.push("a");
        let b = arena.push("b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(*arena.get(b), "b");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.ids(), vec![a, b]);
    }

    #[test]
    fn debug_prefix() {
        assert_eq!(format!("{:?}", ScopeId::from_index(4)), "sc4");
        assert_eq!(format!("{:?}", TypeId::from_index(0)), "t0");
    }
}

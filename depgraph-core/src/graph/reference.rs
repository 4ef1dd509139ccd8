//! Item Identity
//!
//! The graph never inspects the items it tracks. It only needs to tell them
//! apart, which is what [`Identity`] provides: a stable [`ItemKey`] for every
//! value that has an identity of its own, and nothing for values that don't.
//!
//! Shared pointers (`Arc`, `Rc`) are keyed by allocation address, so two
//! clones of the same allocation are the same item while two structurally
//! equal allocations are not. Empty slices and strings built with `Default`
//! (`Arc::<str>::default()`, `Rc::<[T]>::default()`) may share one static
//! allocation, in which case they are the same item too. Callers that
//! already have stable handles can use [`ItemKey`] directly as the item type.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Identity key of an item tracked by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(u64);

impl ItemKey {
    /// Derive a key from a pointer address.
    pub fn from_ptr<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize as u64)
    }

    /// Get the raw key value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemKey {
    fn from(key: u64) -> Self {
        Self(key)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Values that can be told apart by the graph.
pub trait Identity {
    /// The stable identity of this value, or `None` if it has none.
    ///
    /// Must return the same key for as long as the value (or any clone
    /// sharing its identity) is alive.
    fn identity(&self) -> Option<ItemKey>;
}

impl<T: ?Sized> Identity for Arc<T> {
    fn identity(&self) -> Option<ItemKey> {
        Some(ItemKey::from_ptr(Arc::as_ptr(self)))
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn identity(&self) -> Option<ItemKey> {
        Some(ItemKey::from_ptr(Rc::as_ptr(self)))
    }
}

impl<I: Identity> Identity for Option<I> {
    fn identity(&self) -> Option<ItemKey> {
        self.as_ref().and_then(Identity::identity)
    }
}

impl Identity for ItemKey {
    fn identity(&self) -> Option<ItemKey> {
        Some(*self)
    }
}

/// Resolve the key of `item`, rejecting values without identity.
pub(crate) fn identity_of<I: Identity>(item: &I) -> GraphResult<ItemKey> {
    item.identity().ok_or_else(GraphError::invalid_item::<I>)
}

/// An item paired with its identity key.
#[derive(Debug, Clone)]
pub struct Reference<T> {
    item: T,
    key: ItemKey,
}

impl<T: Identity> Reference<T> {
    /// Wrap `item`, failing with [`GraphError::InvalidItem`] if it has no identity.
    pub fn new(item: T) -> GraphResult<Self> {
        let key = identity_of(&item)?;
        Ok(Self { item, key })
    }
}

impl<T> Reference<T> {
    /// Get the identity key.
    pub fn id(&self) -> ItemKey {
        self.key
    }

    /// Get the wrapped item.
    pub fn value(&self) -> &T {
        &self.item
    }

    /// Unwrap the item.
    pub fn into_value(self) -> T {
        self.item
    }
}

mod lists;
mod scalars;

use std::ops::Deref;
use std::sync::Arc;

pub use lists::Lists;
pub use scalars::{Scalars, Value};

/// The Store owns the two keyspaces served by the server: scalar values, with optional expiry, and
/// lists. A key may exist in both at once, they never interact.
///
/// Each keyspace sits behind its own reader/writer lock, and every command touches exactly one of
/// them. The store is cheap to clone, clones share the same data through reference counting.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Self::default()
    }
}

#[derive(Default)]
pub struct InnerStore {
    pub scalars: Scalars,
    pub lists: Lists,
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

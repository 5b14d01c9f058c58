//! Namespaced key-value storage used by the blocklist.
//!
//! Keys are hierarchical (`/safemode/blocklist/<cid>`); a [`Namespaced`] view
//! carves one underlying [`Datastore`] into disjoint sub-stores.

mod error;
mod key;
mod traits;

pub mod filesystem;
pub mod memory;
pub mod namespace;

pub use error::StoreError;
pub use key::Key;
pub use namespace::Namespaced;
pub use traits::{Datastore, Entry, Order, Query};

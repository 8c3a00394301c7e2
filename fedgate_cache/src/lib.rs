//! Process-wide cache of fragment lists.
//!
//! All segments of one distributed query ask for the fragments of the same data source at about
//! the same time. [`FragmentCache`] makes sure the listing runs once per query (per
//! [`CacheKey`]) and hands every caller the same shared list. Entries expire after a period
//! without any access.

mod cache;
mod key;

pub use cache::{DEFAULT_IDLE_EXPIRY, FragmentCache};
pub use key::CacheKey;

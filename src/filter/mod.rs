//! Filter cores behind the filter policies.
//!
//! A core turns a set of 64-bit keys into a serialized filter and answers
//! membership and successor queries over a deserialized one. The policy
//! layer only talks to cores through [`FilterCore`], so a different core can
//! be plugged in without touching builders or readers.

pub mod bloom;
pub mod elastic;
pub mod format;
pub mod rosetta;

pub use bloom::{BloomFilter, MAX_BITS_PER_KEY};
pub use elastic::{ElasticParams, ElasticRosetta};
pub use rosetta::Rosetta;

use crate::error::Result;

/// A range filter over 64-bit keys.
pub trait FilterCore: Sized + Send + Sync {
    /// Accuracy parameters the core is built with.
    type Params: Clone + Send + Sync + std::fmt::Debug;

    /// Build a filter over `keys`. Duplicates are allowed.
    fn build(keys: &[u64], params: &Self::Params) -> Result<Self>;

    /// Exact length of [`FilterCore::serialize`]'s output.
    fn serialized_size(&self) -> usize;

    /// Serialize the filter into a new buffer.
    fn serialize(&self) -> Vec<u8>;

    /// Load a filter, materializing at most `open_size` resolution units.
    /// Cores without resolution units ignore `open_size`.
    fn deserialize(data: &[u8], open_size: usize) -> Result<Self>;

    /// Check if a key may have been inserted (can have false positives).
    fn lookup_key(&self, key: u64) -> bool;

    /// Smallest key `>= key` that may have been inserted, if any.
    fn seek(&self, key: u64) -> Option<u64>;

    /// Number of resolution units materialized, for cores that have them.
    fn open_size(&self) -> Option<usize> {
        None
    }
}

//! Filter policies exposed to the storage engine.
//!
//! A [`FilterPolicy`] is the single entry point the engine holds. It names
//! the filters it writes, hands out a [`FilterBitsBuilder`] per filter to
//! build and a [`FilterBitsReader`] per filter to query, and offers one-shot
//! `create_filter` / `key_may_match` for callers that skip the
//! builder/reader split.
//!
//! ```text
//! engine ── filter_bits_builder() ──> builder ── add_key()* ── finish() ──> blob
//! engine ── filter_bits_reader(blob) ──> reader ── may_match() / seek()
//! ```
//!
//! Filters are persisted as a single opaque blob; this layer adds no framing
//! of its own. The engine stores [`FilterPolicy::name`] next to the blob and
//! checks it with [`FilterPolicy::verify_name`] before reading.

pub mod builder;
pub mod elastic;
pub mod reader;
pub mod rosetta;

pub use builder::FullFilterBitsBuilder;
pub use elastic::ElasticRosettaPolicy;
pub use reader::FullFilterBitsReader;
pub use rosetta::RosettaPolicy;

use crate::error::{Error, Result};
use crate::filter::FilterCore;
use crate::key::KEY_SIZE;

/// Name of filters written by [`RosettaPolicy`].
pub const ROSETTA_POLICY_NAME: &str = "rocksdb.RosettaFilter";

/// Name of filters written by [`ElasticRosettaPolicy`].
pub const ELASTIC_ROSETTA_POLICY_NAME: &str = "rocksdb.ElasticRosettaFilter";

/// Accumulates the keys of one filter.
pub trait FilterBitsBuilder: Send {
    /// Add a key. Only its first 8 bytes are indexed.
    fn add_key(&mut self, key: &[u8]) -> Result<()>;

    /// Number of entries the filter will hold; `space` is advisory.
    fn estimate_entry_count(&self, space: usize) -> usize;

    /// Build the filter and hand its bytes to the caller.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// Queries one filter.
pub trait FilterBitsReader: Send + Sync {
    /// Returns `false` only if `key` was not added to the filter.
    fn may_match(&self, key: &[u8]) -> bool;

    /// Smallest key `>= key` the filter may hold, big-endian encoded so that
    /// results compare as bytes. `None` if there is none.
    fn seek(&self, key: &[u8]) -> Result<Option<[u8; KEY_SIZE]>>;

    /// Resolution units materialized by this reader, for elastic filters.
    fn open_size(&self) -> Option<usize>;
}

/// Factory for filter builders and readers.
pub trait FilterPolicy: Send + Sync {
    /// Name recorded with every filter this policy writes. Changing the
    /// filter format requires changing the name.
    fn name(&self) -> &'static str;

    /// Build a filter over `keys` and append it to `dst`.
    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>) -> Result<()>;

    /// Load `filter` and check `key` against it.
    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool>;

    /// Like [`FilterPolicy::key_may_match`], opening at most `open_size`
    /// resolution units. Policies without them ignore `open_size`.
    fn elastic_key_may_match(&self, key: &[u8], filter: &[u8], open_size: usize) -> Result<bool> {
        let _ = open_size;
        self.key_may_match(key, filter)
    }

    /// A builder for one filter, or `None` if the policy is configured for
    /// the block-based format.
    fn filter_bits_builder(&self) -> Option<Box<dyn FilterBitsBuilder>>;

    /// A reader over `contents`.
    fn filter_bits_reader(&self, contents: &[u8]) -> Result<Box<dyn FilterBitsReader>>;

    /// A reader over `contents` opening at most `open_size` resolution units.
    fn elastic_filter_bits_reader(
        &self,
        contents: &[u8],
        open_size: usize,
    ) -> Result<Box<dyn FilterBitsReader>> {
        let _ = open_size;
        self.filter_bits_reader(contents)
    }

    /// Check that a filter persisted under `persisted_name` can be read by
    /// this policy.
    fn verify_name(&self, persisted_name: &str) -> Result<()> {
        if persisted_name != self.name() {
            return Err(Error::PolicyMismatch {
                expected: self.name().to_string(),
                actual: persisted_name.to_string(),
            });
        }
        Ok(())
    }
}

/// Create a standard Rosetta policy.
pub fn new_rosetta_policy(
    use_block_based_builder: bool,
    bits_per_key: u64,
) -> Box<dyn FilterPolicy> {
    Box::new(RosettaPolicy::new(use_block_based_builder, bits_per_key))
}

/// Create an elastic Rosetta policy.
pub fn new_elastic_rosetta_policy(
    use_block_based_builder: bool,
    bits_per_key: u64,
    last_level_bits_per_keys: Vec<u64>,
) -> Box<dyn FilterPolicy> {
    Box::new(ElasticRosettaPolicy::new(
        use_block_based_builder,
        bits_per_key,
        last_level_bits_per_keys,
    ))
}

/// Build a filter through a fresh builder and append it to `dst`.
pub(crate) fn create_filter_with<C: FilterCore>(
    params: C::Params,
    keys: &[&[u8]],
    dst: &mut Vec<u8>,
) -> Result<()> {
    let mut builder = FullFilterBitsBuilder::<C>::new(params);
    for key in keys {
        builder.add_key(key)?;
    }
    let filter = builder.finish()?;
    dst.extend_from_slice(&filter);
    Ok(())
}

//! # Rosetta Filter - Range Filter Policies for LSM-Tree Storage Engines
//!
//! This crate plugs Rosetta range filters into an LSM-Tree storage engine's
//! filter-policy interface. A filter is attached to each data block or table
//! file; it rejects keys that are definitely absent before any disk read and
//! answers approximate successor queries so range scans can skip blocks.
//!
//! ## Architecture
//!
//! - **Key Codec** ([`key`]): fixed 8-byte keys in, big-endian successors out
//! - **Filter Cores** ([`filter`]): the Rosetta prefix-Bloom stack and its
//!   elastic variant, behind the [`filter::FilterCore`] trait
//! - **Policies** ([`policy`]): the engine-facing builder/reader factories
//! - **Options** ([`config`]): accuracy budgets and policy selection
//!
//! Two policies are provided. [`RosettaPolicy`] gives every level the same
//! bits-per-key budget. [`ElasticRosettaPolicy`] splits the full-key level
//! into units with their own budgets; a reader picks how many units to open,
//! trading memory for false positive rate over one persisted filter.
//!
//! ## Example Usage
//!
//! ```rust
//! use rosetta_filter::key::{decode_successor, encode_key};
//! use rosetta_filter::FilterOptions;
//!
//! # fn main() -> Result<(), rosetta_filter::Error> {
//! let policy = FilterOptions::standard(10).build_policy()?;
//!
//! // Build a filter for one block
//! let mut builder = policy.filter_bits_builder().expect("full filters are enabled");
//! for key in [1u64, 5, 9] {
//!     builder.add_key(&encode_key(key))?;
//! }
//! let blob = builder.finish()?;
//!
//! // Query it later
//! let reader = policy.filter_bits_reader(&blob)?;
//! assert!(reader.may_match(&encode_key(5)));
//!
//! if let Some(next) = reader.seek(&encode_key(6))? {
//!     assert!(decode_successor(next) >= 6);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod config;
pub mod error;
pub mod filter;
pub mod key;
pub mod policy;

// Re-exports
pub use config::{FilterOptions, PolicyKind};
pub use error::{Error, Result};
pub use policy::{
    new_elastic_rosetta_policy, new_rosetta_policy, ElasticRosettaPolicy, FilterBitsBuilder,
    FilterBitsReader, FilterPolicy, RosettaPolicy,
};

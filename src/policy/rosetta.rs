//! Standard Rosetta policy: one bits-per-key budget for every level.

use crate::error::Result;
use crate::filter::Rosetta;
use crate::policy::{
    create_filter_with, FilterBitsBuilder, FilterBitsReader, FilterPolicy,
    FullFilterBitsBuilder, FullFilterBitsReader, ROSETTA_POLICY_NAME,
};

/// Filter policy producing uniform Rosetta filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosettaPolicy {
    use_block_based_builder: bool,
    bits_per_key: u64,
}

impl RosettaPolicy {
    /// Create a policy. With `use_block_based_builder` set the policy hands
    /// out no builders.
    pub fn new(use_block_based_builder: bool, bits_per_key: u64) -> Self {
        Self {
            use_block_based_builder,
            bits_per_key,
        }
    }

    /// Bits per key of every level.
    pub fn bits_per_key(&self) -> u64 {
        self.bits_per_key
    }
}

impl FilterPolicy for RosettaPolicy {
    fn name(&self) -> &'static str {
        ROSETTA_POLICY_NAME
    }

    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>) -> Result<()> {
        create_filter_with::<Rosetta>(self.bits_per_key, keys, dst)
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool> {
        let reader = FullFilterBitsReader::<Rosetta>::new(filter, 0)?;
        Ok(reader.may_match(key))
    }

    fn filter_bits_builder(&self) -> Option<Box<dyn FilterBitsBuilder>> {
        if self.use_block_based_builder {
            log::debug!("{} has no block-based builder", self.name());
            return None;
        }
        Some(Box::new(FullFilterBitsBuilder::<Rosetta>::new(
            self.bits_per_key,
        )))
    }

    fn filter_bits_reader(&self, contents: &[u8]) -> Result<Box<dyn FilterBitsReader>> {
        Ok(Box::new(FullFilterBitsReader::<Rosetta>::new(contents, 0)?))
    }
}

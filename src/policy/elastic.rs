//! Elastic Rosetta policy: filters whose full-key level can be opened at
//! different resolutions per read.

use crate::config::DEFAULT_OPEN_SIZE;
use crate::error::Result;
use crate::filter::{ElasticParams, ElasticRosetta};
use crate::policy::{
    create_filter_with, FilterBitsBuilder, FilterBitsReader, FilterPolicy,
    FullFilterBitsBuilder, FullFilterBitsReader, ELASTIC_ROSETTA_POLICY_NAME,
};

/// Filter policy producing elastic Rosetta filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticRosettaPolicy {
    use_block_based_builder: bool,
    params: ElasticParams,
    default_open_size: usize,
}

impl ElasticRosettaPolicy {
    /// Create a policy. `last_level_bits_per_keys` holds one budget per
    /// full-key unit and bounds the open size readers can use.
    pub fn new(
        use_block_based_builder: bool,
        bits_per_key: u64,
        last_level_bits_per_keys: Vec<u64>,
    ) -> Self {
        Self {
            use_block_based_builder,
            params: ElasticParams::new(bits_per_key, last_level_bits_per_keys),
            default_open_size: DEFAULT_OPEN_SIZE,
        }
    }

    /// Sets the open size used by [`FilterPolicy::key_may_match`] and
    /// [`FilterPolicy::filter_bits_reader`].
    pub fn with_default_open_size(mut self, open_size: usize) -> Self {
        self.default_open_size = open_size;
        self
    }

    /// Open size used when the caller does not pick one.
    pub fn default_open_size(&self) -> usize {
        self.default_open_size
    }

    /// Accuracy parameters of the filters this policy builds.
    pub fn params(&self) -> &ElasticParams {
        &self.params
    }
}

impl FilterPolicy for ElasticRosettaPolicy {
    fn name(&self) -> &'static str {
        ELASTIC_ROSETTA_POLICY_NAME
    }

    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>) -> Result<()> {
        create_filter_with::<ElasticRosetta>(self.params.clone(), keys, dst)
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> Result<bool> {
        self.elastic_key_may_match(key, filter, self.default_open_size)
    }

    fn elastic_key_may_match(&self, key: &[u8], filter: &[u8], open_size: usize) -> Result<bool> {
        let reader = FullFilterBitsReader::<ElasticRosetta>::new(filter, open_size)?;
        Ok(reader.may_match(key))
    }

    fn filter_bits_builder(&self) -> Option<Box<dyn FilterBitsBuilder>> {
        if self.use_block_based_builder {
            log::debug!("{} has no block-based builder", self.name());
            return None;
        }
        Some(Box::new(FullFilterBitsBuilder::<ElasticRosetta>::new(
            self.params.clone(),
        )))
    }

    fn filter_bits_reader(&self, contents: &[u8]) -> Result<Box<dyn FilterBitsReader>> {
        self.elastic_filter_bits_reader(contents, self.default_open_size)
    }

    fn elastic_filter_bits_reader(
        &self,
        contents: &[u8],
        open_size: usize,
    ) -> Result<Box<dyn FilterBitsReader>> {
        Ok(Box::new(FullFilterBitsReader::<ElasticRosetta>::new(
            contents, open_size,
        )?))
    }
}

//! Elastic Rosetta: a Rosetta filter whose full-key level can be opened at
//! different resolutions.
//!
//! Levels 1..=63 are ordinary prefix Bloom filters. The full-key level is
//! split into *units*, one Bloom filter per entry of the last-level
//! bits-per-key sequence, each with its own seed. A key passes the full-key
//! level only if every opened unit admits it, so opening more units lowers
//! the false positive rate while inserted keys keep passing.
//!
//! Only the units a reader asks for are decoded; the rest of the filter stays
//! in the serialized buffer.

use crate::error::{Error, Result};
use crate::filter::bloom::check_bits_per_key;
use crate::filter::format::{self, Header, Variant};
use crate::filter::rosetta::{build_levels, seek_with, sorted_unique, NUM_LEVELS};
use crate::filter::{BloomFilter, FilterCore};

/// Number of prefix levels stored above the full-key units.
pub const UPPER_LEVELS: usize = NUM_LEVELS as usize - 1;

/// Seed of the first last-level unit; later units count up from it.
const UNIT_SEED_BASE: u32 = 0x100;

/// Accuracy parameters of an elastic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticParams {
    /// Bits per key of the prefix levels.
    pub bits_per_key: u64,
    /// Bits per key of each full-key unit, in open order.
    pub last_level_bits_per_keys: Vec<u64>,
}

impl ElasticParams {
    /// Create elastic parameters.
    pub fn new(bits_per_key: u64, last_level_bits_per_keys: Vec<u64>) -> Self {
        Self {
            bits_per_key,
            last_level_bits_per_keys,
        }
    }
}

/// Elastic Rosetta core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticRosetta {
    /// `upper[i]` indexes prefixes of length `i + 1`.
    upper: Vec<BloomFilter>,
    /// Opened full-key units.
    units: Vec<BloomFilter>,
    /// Units present in the serialized filter.
    total_units: usize,
    num_keys: u64,
    bits_per_key: u64,
}

impl ElasticRosetta {
    /// Number of full-key units currently materialized.
    pub fn opened_units(&self) -> usize {
        self.units.len()
    }

    /// Number of full-key units stored in the filter.
    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Number of keys the filter was built from, duplicates included.
    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    /// Size of all materialized bit arrays in bytes.
    pub fn memory_usage(&self) -> usize {
        self.upper
            .iter()
            .chain(&self.units)
            .map(BloomFilter::size)
            .sum()
    }

    fn may_exist(&self, len: u32, prefix: u64) -> bool {
        if len < NUM_LEVELS {
            self.upper[(len - 1) as usize].may_contain(prefix)
        } else {
            self.lookup_key(prefix)
        }
    }
}

impl FilterCore for ElasticRosetta {
    type Params = ElasticParams;

    fn build(keys: &[u64], params: &ElasticParams) -> Result<Self> {
        check_bits_per_key(params.bits_per_key)?;
        if params.last_level_bits_per_keys.is_empty() {
            return Err(Error::filter_core(
                "Elastic filters need at least one last-level unit",
            ));
        }
        for &bits in &params.last_level_bits_per_keys {
            check_bits_per_key(bits)?;
        }

        let sorted = sorted_unique(keys);
        let upper = build_levels(&sorted, 1..=UPPER_LEVELS as u32, params.bits_per_key)?;

        let units = params
            .last_level_bits_per_keys
            .iter()
            .enumerate()
            .map(|(i, &bits)| {
                let seed = UNIT_SEED_BASE + i as u32;
                let mut unit = BloomFilter::with_bits_per_key(sorted.len(), bits, seed)?;
                for &key in &sorted {
                    unit.insert(key);
                }
                Ok(unit)
            })
            .collect::<Result<Vec<_>>>()?;

        log::trace!(
            "Built elastic Rosetta filter over {} keys with {} last-level units",
            keys.len(),
            units.len()
        );

        Ok(Self {
            upper,
            total_units: units.len(),
            units,
            num_keys: keys.len() as u64,
            bits_per_key: params.bits_per_key,
        })
    }

    fn serialized_size(&self) -> usize {
        format::encoded_len(self.upper.iter().chain(&self.units))
    }

    /// Serialize the materialized levels and units.
    ///
    /// A partially opened filter serializes only the units it holds.
    fn serialize(&self) -> Vec<u8> {
        let header = Header {
            variant: Variant::Elastic,
            num_keys: self.num_keys,
            bits_per_key: self.bits_per_key,
        };
        format::encode(&header, self.upper.iter().chain(&self.units))
    }

    fn deserialize(data: &[u8], open_size: usize) -> Result<Self> {
        let parsed = format::decode(data)?;
        if parsed.header.variant != Variant::Elastic {
            return Err(Error::filter_core(format!(
                "Expected an elastic Rosetta filter, found {:?}",
                parsed.header.variant
            )));
        }
        if parsed.sections.len() <= UPPER_LEVELS {
            return Err(Error::filter_core(format!(
                "Elastic filter has {} sections, expected more than {}",
                parsed.sections.len(), UPPER_LEVELS
            )));
        }

        let total_units = parsed.sections.len() - UPPER_LEVELS;
        let opened = open_size.min(total_units);
        if opened < open_size {
            log::debug!(
                "Requested open size {} exceeds {} last-level units, opening {}",
                open_size,
                total_units,
                opened
            );
        }

        let upper = (0..UPPER_LEVELS)
            .map(|i| parsed.bloom(i))
            .collect::<Result<Vec<_>>>()?;
        let units = (UPPER_LEVELS..UPPER_LEVELS + opened)
            .map(|i| parsed.bloom(i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            upper,
            units,
            total_units,
            num_keys: parsed.header.num_keys,
            bits_per_key: parsed.header.bits_per_key,
        })
    }

    fn lookup_key(&self, key: u64) -> bool {
        if self.units.is_empty() {
            // Nothing of the full-key level is open; the parent prefix level
            // is the finest test available.
            return self.upper[UPPER_LEVELS - 1].may_contain(key >> 1);
        }
        self.units.iter().all(|unit| unit.may_contain(key))
    }

    fn seek(&self, key: u64) -> Option<u64> {
        seek_with(key, |len, prefix| self.may_exist(len, prefix))
    }

    fn open_size(&self) -> Option<usize> {
        Some(self.units.len())
    }
}

//! Rosetta: a range filter built from a stack of prefix Bloom filters.
//!
//! Level `l` (1..=64) indexes the `l`-bit prefix `key >> (64 - l)` of every
//! key, so level 64 indexes the keys themselves. Point lookups consult level
//! 64 only. A successor seek walks the implicit binary trie from the root,
//! left child first, and abandons any subtree whose prefix its level rejects.
//!
//! Because a Bloom filter never rejects an inserted prefix, the walk can skip
//! only subtrees that hold no key, and the first leaf it reaches is never
//! larger than the smallest real key at or after the probe.

use crate::error::{Error, Result};
use crate::filter::bloom::check_bits_per_key;
use crate::filter::format::{self, Header, Variant};
use crate::filter::{BloomFilter, FilterCore};
use crate::key::KEY_BITS;

/// Number of prefix levels in a filter over 64-bit keys.
pub const NUM_LEVELS: u32 = KEY_BITS as u32;

/// The `len`-bit prefix of `key`.
pub(crate) fn prefix_of(key: u64, len: u32) -> u64 {
    match len {
        0 => 0,
        l if l >= NUM_LEVELS => key,
        l => key >> (NUM_LEVELS - l),
    }
}

/// Build one Bloom filter per prefix length in `lengths` over `sorted_keys`.
///
/// `sorted_keys` must be sorted and free of duplicates; each level is sized
/// by its number of distinct prefixes and seeded with its prefix length.
pub(crate) fn build_levels(
    sorted_keys: &[u64],
    lengths: std::ops::RangeInclusive<u32>,
    bits_per_key: u64,
) -> Result<Vec<BloomFilter>> {
    lengths
        .map(|len| {
            let mut prefixes: Vec<u64> =
                sorted_keys.iter().map(|&k| prefix_of(k, len)).collect();
            prefixes.dedup();

            let mut bloom = BloomFilter::with_bits_per_key(prefixes.len(), bits_per_key, len)?;
            for prefix in prefixes {
                bloom.insert(prefix);
            }
            Ok(bloom)
        })
        .collect()
}

/// Sorted, deduplicated copy of `keys`.
pub(crate) fn sorted_unique(keys: &[u64]) -> Vec<u64> {
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Smallest full-length prefix `>= key` that `may_exist` admits on every
/// level along its path.
///
/// `may_exist(len, prefix)` is asked about prefixes of length 1..=64.
pub(crate) fn seek_with<F>(key: u64, may_exist: F) -> Option<u64>
where
    F: Fn(u32, u64) -> bool,
{
    fn descend<F: Fn(u32, u64) -> bool>(
        key: u64,
        len: u32,
        prefix: u64,
        bounded: bool,
        may_exist: &F,
    ) -> Option<u64> {
        if len == NUM_LEVELS {
            return Some(prefix);
        }

        // While the path still equals the probe's prefix, children left of
        // the probe's next bit are below the probe.
        let first = if bounded {
            (key >> (NUM_LEVELS - 1 - len)) & 1
        } else {
            0
        };
        for bit in first..=1 {
            let child = (prefix << 1) | bit;
            if may_exist(len + 1, child) {
                let found = descend(key, len + 1, child, bounded && bit == first, may_exist);
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    descend(key, 0, 0, true, &may_exist)
}

/// Uniform Rosetta core: 64 prefix levels sharing one bits-per-key budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rosetta {
    /// `levels[i]` indexes prefixes of length `i + 1`.
    levels: Vec<BloomFilter>,
    num_keys: u64,
    bits_per_key: u64,
}

impl Rosetta {
    /// Number of keys the filter was built from, duplicates included.
    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    /// Bits per key used for every level.
    pub fn bits_per_key(&self) -> u64 {
        self.bits_per_key
    }

    /// Total size of all level bit arrays in bytes.
    pub fn memory_usage(&self) -> usize {
        self.levels.iter().map(BloomFilter::size).sum()
    }

    fn level(&self, len: u32) -> &BloomFilter {
        &self.levels[(len - 1) as usize]
    }
}

impl FilterCore for Rosetta {
    type Params = u64;

    fn build(keys: &[u64], bits_per_key: &u64) -> Result<Self> {
        check_bits_per_key(*bits_per_key)?;

        let sorted = sorted_unique(keys);
        let levels = build_levels(&sorted, 1..=NUM_LEVELS, *bits_per_key)?;

        log::trace!(
            "Built Rosetta filter over {} keys ({} distinct), {} bytes",
            keys.len(),
            sorted.len(),
            levels.iter().map(BloomFilter::size).sum::<usize>()
        );

        Ok(Self {
            levels,
            num_keys: keys.len() as u64,
            bits_per_key: *bits_per_key,
        })
    }

    fn serialized_size(&self) -> usize {
        format::encoded_len(&self.levels)
    }

    fn serialize(&self) -> Vec<u8> {
        let header = Header {
            variant: Variant::Uniform,
            num_keys: self.num_keys,
            bits_per_key: self.bits_per_key,
        };
        format::encode(&header, &self.levels)
    }

    /// Uniform filters have no partial form; `open_size` is ignored.
    fn deserialize(data: &[u8], _open_size: usize) -> Result<Self> {
        let parsed = format::decode(data)?;
        if parsed.header.variant != Variant::Uniform {
            return Err(Error::filter_core(format!(
                "Expected a uniform Rosetta filter, found {:?}",
                parsed.header.variant
            )));
        }
        if parsed.sections.len() != NUM_LEVELS as usize {
            return Err(Error::filter_core(format!(
                "Expected {} levels, found {}",
                NUM_LEVELS, parsed.sections.len()
            )));
        }

        let levels = (0..parsed.sections.len())
            .map(|i| parsed.bloom(i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            levels,
            num_keys: parsed.header.num_keys,
            bits_per_key: parsed.header.bits_per_key,
        })
    }

    fn lookup_key(&self, key: u64) -> bool {
        self.level(NUM_LEVELS).may_contain(key)
    }

    fn seek(&self, key: u64) -> Option<u64> {
        seek_with(key, |len, prefix| self.level(len).may_contain(prefix))
    }
}

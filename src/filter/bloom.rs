//! Bloom Filter over 64-bit keys.
//!
//! A space-efficient probabilistic data structure used to test whether an element
//! is a member of a set. False positive matches are possible, but false negatives are not.
//!
//! Every level of a Rosetta filter is one of these, so each filter carries a
//! seed that keeps the hash functions of sibling filters independent.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use std::hash::Hasher;

/// Size of the encoded header: num_hashes (4) + seed (4) + num_bits (8).
pub const BLOOM_HEADER_SIZE: usize = 16;

/// Smallest bit array a filter is allowed to have.
const MIN_BITS: usize = 64;

/// Largest bits-per-key budget a filter accepts.
pub const MAX_BITS_PER_KEY: u64 = 64;

/// Most hash functions a filter may use.
pub const MAX_HASHES: u32 = 30;

/// BloomFilter provides probabilistic set membership testing for `u64` keys.
///
/// # Example
/// ```
/// use rosetta_filter::filter::BloomFilter;
///
/// let mut filter = BloomFilter::with_bits_per_key(1000, 10, 0).unwrap();
/// filter.insert(1001);
/// filter.insert(1002);
///
/// assert!(filter.may_contain(1001));
/// assert!(filter.may_contain(1002));
/// // 1003 might return true (false positive) or false
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array for the bloom filter
    bits: Vec<u8>,
    /// Number of hash functions to use
    num_hashes: u32,
    /// Number of bits in the filter
    num_bits: usize,
    /// Seed mixed into both base hashes
    seed: u32,
}

impl BloomFilter {
    /// Create a BloomFilter with a specific number of bits per key.
    ///
    /// # Arguments
    /// * `num_keys` - Number of distinct keys that will be inserted
    /// * `bits_per_key` - Number of bits to allocate per key
    /// * `seed` - Hash seed, distinct for filters that index the same keys
    ///
    /// # Errors
    ///
    /// Returns `FilterCore` if `bits_per_key` is outside `1..=MAX_BITS_PER_KEY`
    /// or the bit array would not be addressable.
    pub fn with_bits_per_key(num_keys: usize, bits_per_key: u64, seed: u32) -> Result<Self> {
        check_bits_per_key(bits_per_key)?;

        let num_bits = u64::try_from(num_keys)
            .ok()
            .and_then(|n| n.checked_mul(bits_per_key))
            .and_then(|bits| usize::try_from(bits).ok())
            .ok_or_else(|| {
                Error::filter_core(format!(
                    "Bloom filter over {} keys at {} bits per key is too large",
                    num_keys, bits_per_key
                ))
            })?
            .max(MIN_BITS);
        let num_hashes = ((bits_per_key as f64) * 0.69).round() as u32; // 0.69 ~= ln(2)
        let num_hashes = num_hashes.clamp(1, MAX_HASHES);

        Ok(Self::with_bits_and_hashes(num_bits, num_hashes, seed))
    }

    fn with_bits_and_hashes(num_bits: usize, num_hashes: u32, seed: u32) -> Self {
        let num_bytes = num_bits.div_ceil(8);

        Self {
            bits: vec![0u8; num_bytes],
            num_hashes,
            num_bits,
            seed,
        }
    }

    /// Generate the bit positions for a key using double hashing:
    /// `h_i = h1 + i * h2 (mod m)`.
    fn bit_positions(&self, key: u64) -> impl Iterator<Item = usize> + '_ {
        let h1 = hash_with_seed(key, self.seed ^ 0xbc9f1d34);
        let h2 = hash_with_seed(key, self.seed ^ 0xd0e89c7b) | 1;
        let m = self.num_bits as u64;

        (0..self.num_hashes as u64)
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
    }

    /// Add a key to the filter.
    pub fn insert(&mut self, key: u64) {
        let positions: Vec<usize> = self.bit_positions(key).collect();
        for pos in positions {
            self.bits[pos / 8] |= 1 << (pos % 8);
        }
    }

    /// Check if a key may exist in the set.
    ///
    /// Returns `false` only if the key was never inserted.
    pub fn may_contain(&self, key: u64) -> bool {
        self.bit_positions(key)
            .all(|pos| self.bits[pos / 8] & (1 << (pos % 8)) != 0)
    }

    /// Get the size of the bit array in bytes.
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Get the number of hash functions used.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the number of bits in the filter.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Get the hash seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Calculate the approximate false positive rate after `num_keys` inserts.
    ///
    /// p = (1 - e^(-kn/m))^k
    pub fn estimated_false_positive_rate(&self, num_keys: usize) -> f64 {
        if num_keys == 0 {
            return 0.0;
        }

        let k = self.num_hashes as f64;
        let n = num_keys as f64;
        let m = self.num_bits as f64;

        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Length of the encoded filter in bytes.
    pub fn encoded_len(&self) -> usize {
        BLOOM_HEADER_SIZE + self.bits.len()
    }

    /// Append the encoded filter to `buf`.
    ///
    /// Format:
    /// [num_hashes: 4 bytes][seed: 4 bytes][num_bits: 8 bytes][bits: variable]
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.num_hashes);
        buf.put_u32_le(self.seed);
        buf.put_u64_le(self.num_bits as u64);
        buf.put_slice(&self.bits);
    }

    /// Decode a filter that occupies all of `data`.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < BLOOM_HEADER_SIZE {
            return Err(Error::filter_core(format!(
                "Bloom filter data too short: {} bytes",
                data.len()
            )));
        }

        let num_hashes = data.get_u32_le();
        let seed = data.get_u32_le();
        let num_bits = data.get_u64_le() as usize;

        if num_hashes == 0 || num_bits == 0 {
            return Err(Error::filter_core(
                "Bloom filter has no bits or no hash functions",
            ));
        }
        if num_hashes > MAX_HASHES {
            return Err(Error::filter_core(format!(
                "Bloom filter uses {} hash functions, at most {} are allowed",
                num_hashes, MAX_HASHES
            )));
        }

        let expected_bytes = num_bits.div_ceil(8);
        if data.len() != expected_bytes {
            return Err(Error::filter_core(format!(
                "Bloom filter size mismatch: expected {} bytes, got {}",
                expected_bytes, data.len()
            )));
        }

        Ok(Self {
            bits: data.to_vec(),
            num_hashes,
            num_bits,
            seed,
        })
    }
}

/// Checks that a bits-per-key budget is within `1..=MAX_BITS_PER_KEY`.
pub fn check_bits_per_key(bits_per_key: u64) -> Result<()> {
    if bits_per_key == 0 || bits_per_key > MAX_BITS_PER_KEY {
        return Err(Error::filter_core(format!(
            "bits_per_key must be in 1..={}, got {}",
            MAX_BITS_PER_KEY, bits_per_key
        )));
    }
    Ok(())
}

fn hash_with_seed(key: u64, seed: u32) -> u64 {
    let mut hasher = FnvHasher::new_with_seed(seed);
    hasher.write_u64(key);
    hasher.finish()
}

/// FNV-1a hasher with a 64-bit avalanche finalizer.
struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    fn new_with_seed(seed: u32) -> Self {
        Self {
            state: Self::FNV_OFFSET_BASIS ^ (seed as u64),
        }
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        let mut h = self.state;
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51afd7ed558ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
        h ^ (h >> 33)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::FNV_PRIME);
        }
    }

    fn write_u64(&mut self, value: u64) {
        self.write(&value.to_le_bytes());
    }
}

//! Full-filter builder shared by the Rosetta policies.

use crate::error::{Error, Result};
use crate::filter::FilterCore;
use crate::key::{decode_key, KEY_BITS};
use crate::policy::FilterBitsBuilder;

/// Collects the keys of one filter and builds it on [`finish`].
///
/// A builder is single-use: after `finish` every call fails with
/// `InvalidState`.
///
/// [`finish`]: FilterBitsBuilder::finish
pub struct FullFilterBitsBuilder<C: FilterCore> {
    params: C::Params,
    keys: Vec<u64>,
    /// Widest key seen, in bits. Never below the decoded key width.
    key_bits: usize,
    finished: bool,
}

impl<C: FilterCore> FullFilterBitsBuilder<C> {
    /// Create a builder that will build with `params`.
    pub fn new(params: C::Params) -> Self {
        Self {
            params,
            keys: Vec::new(),
            key_bits: KEY_BITS,
            finished: false,
        }
    }

    /// Number of keys added so far.
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Width in bits of the widest key added so far.
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Parameters the filter will be built with.
    pub fn params(&self) -> &C::Params {
        &self.params
    }

    fn ensure_accumulating(&self) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_state("Filter builder already finished"));
        }
        Ok(())
    }
}

impl<C: FilterCore> FilterBitsBuilder for FullFilterBitsBuilder<C> {
    fn add_key(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_accumulating()?;

        let decoded = decode_key(key)?;
        self.key_bits = self.key_bits.max(key.len() * 8);
        self.keys.push(decoded);
        Ok(())
    }

    fn estimate_entry_count(&self, _space: usize) -> usize {
        self.keys.len()
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.ensure_accumulating()?;
        self.finished = true;

        let keys = std::mem::take(&mut self.keys);
        let core = C::build(&keys, &self.params)?;
        let size = core.serialized_size();
        let data = core.serialize();
        drop(core);

        debug_assert_eq!(data.len(), size);
        log::debug!(
            "Finished filter over {} keys: {} bytes",
            keys.len(),
            data.len()
        );

        Ok(data)
    }
}

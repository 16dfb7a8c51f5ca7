//! Full-filter reader shared by the Rosetta policies.

use crate::error::Result;
use crate::filter::FilterCore;
use crate::key::{decode_key, encode_successor, KEY_SIZE};
use crate::policy::FilterBitsReader;

/// Answers queries against one deserialized filter.
///
/// Each reader owns a private core, so any number of readers can be built
/// concurrently over the same serialized filter.
pub struct FullFilterBitsReader<C: FilterCore> {
    core: C,
}

impl<C: FilterCore> FullFilterBitsReader<C> {
    /// Load `contents`, materializing at most `open_size` resolution units.
    pub fn new(contents: &[u8], open_size: usize) -> Result<Self> {
        let core = C::deserialize(contents, open_size)?;
        Ok(Self { core })
    }

    /// The underlying filter core.
    pub fn core(&self) -> &C {
        &self.core
    }
}

impl<C: FilterCore> FilterBitsReader for FullFilterBitsReader<C> {
    fn may_match(&self, key: &[u8]) -> bool {
        match decode_key(key) {
            Ok(key) => self.core.lookup_key(key),
            Err(e) => {
                // A key the filter cannot decode cannot be ruled out.
                log::debug!("Treating undecodable key as a match: {}", e);
                true
            }
        }
    }

    fn seek(&self, key: &[u8]) -> Result<Option<[u8; KEY_SIZE]>> {
        let key = decode_key(key)?;
        Ok(self.core.seek(key).map(encode_successor))
    }

    fn open_size(&self) -> Option<usize> {
        self.core.open_size()
    }
}

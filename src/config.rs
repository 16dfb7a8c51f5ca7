//! Configuration options for the Rosetta filter policies.

use crate::error::{Error, Result};
use crate::filter::MAX_BITS_PER_KEY;
use crate::policy::{ElasticRosettaPolicy, FilterPolicy, RosettaPolicy};
use serde::{Deserialize, Serialize};

/// Default bits per key (roughly 1% false positives per level).
pub const DEFAULT_BITS_PER_KEY: u64 = 10;

/// Open size used by elastic readers when the caller does not pick one.
pub const DEFAULT_OPEN_SIZE: usize = 3;

/// Which filter policy to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// One bits-per-key budget for every level.
    Standard,
    /// Base budget for prefix levels plus per-unit budgets on the full-key level.
    Elastic,
}

/// Configuration options for a filter policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Policy variant.
    /// Default: Standard
    pub kind: PolicyKind,

    /// Ask for the legacy block-based filter format. Such policies hand out
    /// no builders.
    /// Default: false
    pub use_block_based_builder: bool,

    /// Bits per key of every level (standard) or of the prefix levels (elastic).
    /// Default: 10
    pub bits_per_key: u64,

    /// Bits per key of each full-key unit, in open order. Elastic only.
    /// Default: [4, 4]
    pub last_level_bits_per_keys: Vec<u64>,

    /// Open size of elastic readers created without an explicit one.
    /// Default: 3
    pub default_open_size: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Standard,
            use_block_based_builder: false,
            bits_per_key: DEFAULT_BITS_PER_KEY,
            last_level_bits_per_keys: vec![4, 4],
            default_open_size: DEFAULT_OPEN_SIZE,
        }
    }
}

impl FilterOptions {
    /// Creates a new FilterOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a standard policy with the given budget.
    pub fn standard(bits_per_key: u64) -> Self {
        Self::default().bits_per_key(bits_per_key)
    }

    /// Options for an elastic policy with the given budgets.
    pub fn elastic(bits_per_key: u64, last_level_bits_per_keys: Vec<u64>) -> Self {
        Self {
            kind: PolicyKind::Elastic,
            bits_per_key,
            last_level_bits_per_keys,
            ..Self::default()
        }
    }

    /// Sets the policy variant.
    pub fn kind(mut self, kind: PolicyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets whether the legacy block-based format is requested.
    pub fn use_block_based_builder(mut self, value: bool) -> Self {
        self.use_block_based_builder = value;
        self
    }

    /// Sets the base bits per key.
    pub fn bits_per_key(mut self, bits_per_key: u64) -> Self {
        self.bits_per_key = bits_per_key;
        self
    }

    /// Sets the per-unit budgets of the full-key level.
    pub fn last_level_bits_per_keys(mut self, bits: Vec<u64>) -> Self {
        self.last_level_bits_per_keys = bits;
        self
    }

    /// Sets the default open size of elastic readers.
    pub fn default_open_size(mut self, open_size: usize) -> Self {
        self.default_open_size = open_size;
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes the options to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BITS_PER_KEY).contains(&self.bits_per_key) {
            return Err(Error::invalid_argument(format!(
                "bits_per_key must be in 1..={}, got {}",
                MAX_BITS_PER_KEY, self.bits_per_key
            )));
        }
        if self.kind == PolicyKind::Elastic {
            if self.last_level_bits_per_keys.is_empty() {
                return Err(Error::invalid_argument(
                    "last_level_bits_per_keys must not be empty for elastic filters",
                ));
            }
            if let Some(bits) = self
                .last_level_bits_per_keys
                .iter()
                .find(|bits| !(1..=MAX_BITS_PER_KEY).contains(*bits))
            {
                return Err(Error::invalid_argument(format!(
                    "last_level_bits_per_keys entries must be in 1..={}, got {}",
                    MAX_BITS_PER_KEY, bits
                )));
            }
        }
        Ok(())
    }

    /// Validates the options and creates the policy they describe.
    pub fn build_policy(&self) -> Result<Box<dyn FilterPolicy>> {
        self.validate()?;

        log::debug!("Creating {:?} filter policy: {:?}", self.kind, self);

        Ok(match self.kind {
            PolicyKind::Standard => Box::new(RosettaPolicy::new(
                self.use_block_based_builder, self.bits_per_key,
            )),
            PolicyKind::Elastic => Box::new(
                ElasticRosettaPolicy::new(
                    self.use_block_based_builder,
                    self.bits_per_key,
                    self.last_level_bits_per_keys.clone(),
                )
                .with_default_open_size(self.default_open_size),
            ),
        })
    }
}

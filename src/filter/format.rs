//! Serialized layout shared by the Rosetta filter cores.
//!
//! ```text
//! [magic: u32][version: u8][variant: u8][num_keys: u64][bits_per_key: u64]
//! [num_sections: u32]
//! [section_len: u32][section bytes] * num_sections
//! [crc32: u32]
//! ```
//!
//! Every section is one encoded [`BloomFilter`]. Sections are located
//! without being decoded so that a reader can materialize only a prefix of
//! them.

use crate::error::{Error, Result};
use crate::filter::BloomFilter;
use bytes::{Buf, BufMut, BytesMut};
use crc32fast::Hasher;

/// Magic number at the start of every filter ("RSTA").
pub const MAGIC: u32 = 0x4154_5352;

/// Current layout version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 26;

/// Size of the checksum trailer in bytes.
pub const TRAILER_SIZE: usize = 4;

/// Which core produced a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Variant {
    /// One Bloom filter per prefix level.
    Uniform = 0,
    /// Prefix levels plus independently openable last-level units.
    Elastic = 1,
}

impl Variant {
    /// Convert from u8 to Variant
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Variant::Uniform),
            1 => Ok(Variant::Elastic),
            _ => Err(Error::filter_core(format!(
                "Unknown filter variant: {}",
                value
            ))),
        }
    }
}

/// Fixed header of a serialized filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Core that wrote the filter.
    pub variant: Variant,
    /// Number of keys the filter was built from, duplicates included.
    pub num_keys: u64,
    /// Base bits per key.
    pub bits_per_key: u64,
}

/// A parsed but not yet materialized filter.
#[derive(Debug)]
pub struct Sections<'a> {
    /// Fixed header.
    pub header: Header,
    /// Encoded sections in write order.
    pub sections: Vec<&'a [u8]>,
}

impl Sections<'_> {
    /// Decode the section at `index` into a Bloom filter.
    pub fn bloom(&self, index: usize) -> Result<BloomFilter> {
        let section = self.sections.get(index).ok_or_else(|| {
            Error::filter_core(format!(
                "Missing section {} of {}",
                index, self.sections.len()
            ))
        })?;
        BloomFilter::decode(section)
    }
}

/// Exact size of `encode(header, sections)`.
pub fn encoded_len<'a>(sections: impl IntoIterator<Item = &'a BloomFilter>) -> usize {
    let body: usize = sections.into_iter().map(|s| 4 + s.encoded_len()).sum();
    HEADER_SIZE + body + TRAILER_SIZE
}

/// Serialize a header and its sections.
pub fn encode<'a>(header: &Header, sections: impl IntoIterator<Item = &'a BloomFilter>) -> Vec<u8> {
    let sections: Vec<&BloomFilter> = sections.into_iter().collect();
    let mut buf = BytesMut::with_capacity(encoded_len(sections.iter().copied()));

    buf.put_u32_le(MAGIC);
    buf.put_u8(FORMAT_VERSION);
    buf.put_u8(header.variant as u8);
    buf.put_u64_le(header.num_keys);
    buf.put_u64_le(header.bits_per_key);
    buf.put_u32_le(sections.len() as u32);

    for section in sections {
        buf.put_u32_le(section.encoded_len() as u32);
        section.encode_to(&mut buf);
    }

    let checksum = checksum(&buf);
    buf.put_u32_le(checksum);

    buf.to_vec()
}

/// Validate a serialized filter and locate its sections.
pub fn decode(data: &[u8]) -> Result<Sections<'_>> {
    if data.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(Error::filter_core(format!(
            "Filter too short: {} bytes",
            data.len()
        )));
    }

    let (body, mut trailer) = data.split_at(data.len() - TRAILER_SIZE);
    let expected = trailer.get_u32_le();
    let actual = checksum(body);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }

    let mut buf = body;
    let magic = buf.get_u32_le();
    if magic != MAGIC {
        return Err(Error::filter_core(format!(
            "Invalid filter magic number: expected {:#x}, got {:#x}",
            MAGIC, magic
        )));
    }

    let version = buf.get_u8();
    if version != FORMAT_VERSION {
        return Err(Error::filter_core(format!(
            "Unsupported filter version: {}",
            version
        )));
    }

    let variant = Variant::from_u8(buf.get_u8())?;
    let num_keys = buf.get_u64_le();
    let bits_per_key = buf.get_u64_le();
    let num_sections = buf.get_u32_le() as usize;

    let mut sections = Vec::with_capacity(num_sections.min(buf.remaining() / 4));
    for i in 0..num_sections {
        if buf.remaining() < 4 {
            return Err(Error::filter_core(format!(
                "Truncated length of section {}",
                i
            )));
        }
        let len = buf.get_u32_le() as usize;
        if buf.remaining() < len {
            return Err(Error::filter_core(format!(
                "Truncated section {}: expected {} bytes, got {}",
                i, len, buf.remaining()
            )));
        }
        sections.push(&buf[..len]);
        buf.advance(len);
    }

    if buf.has_remaining() {
        return Err(Error::filter_core(format!(
            "{} trailing bytes after last section",
            buf.remaining()
        )));
    }

    Ok(Sections {
        header: Header {
            variant,
            num_keys,
            bits_per_key,
        },
        sections,
    })
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

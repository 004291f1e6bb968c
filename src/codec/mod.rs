//! Byte layout primitives
//!
//! Offsets are 4-byte little-endian positions relative to the start of
//! the enclosing value; mixed-in lengths are 8-byte little-endian.

mod composite;

pub use composite::{offset_table, serialize_composite, split_composite, CompositeField, FieldLayout};

use std::io::{Read, Write};

use thiserror::Error;

/// Width of one offset in the fixed region.
pub const OFFSET_BYTE_LENGTH: u64 = 4;

/// Width of a mixed-in list length.
pub const LENGTH_BYTE_LENGTH: u64 = 8;

/// Errors raised while encoding or decoding bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An offset or element size does not fit in 4 bytes.
    #[error("offset {offset} does not fit in a 4-byte field")]
    OffsetOverflow {
        /// The value that overflowed.
        offset: u64,
    },

    /// Byte region length outside the type's bounds.
    #[error("scope of {scope} bytes outside [{min}, {max}]")]
    Scope {
        /// Available bytes.
        scope: u64,
        /// Smallest valid encoding.
        min: u64,
        /// Largest valid encoding.
        max: u64,
    },

    /// First offset does not point just past the fixed region.
    #[error("first offset {offset} does not match fixed region length {expected}")]
    FirstOffsetMismatch {
        /// Offset read from the table.
        offset: u64,
        /// Length of the fixed region.
        expected: u64,
    },

    /// Offsets are not in non-decreasing order.
    #[error("offset {offset} precedes previous offset {previous}")]
    OffsetOutOfOrder {
        /// Offset read from the table.
        offset: u64,
        /// Offset read just before it.
        previous: u64,
    },

    /// Offset points past the end of the value.
    #[error("offset {offset} beyond value length {length}")]
    OffsetBeyondEnd {
        /// Offset read from the table.
        offset: u64,
        /// Total value length.
        length: u64,
    },

    /// Fixed region is cut short.
    #[error("need {needed} bytes for the fixed region, only {available} available")]
    Truncated {
        /// Bytes required.
        needed: u64,
        /// Bytes present.
        available: u64,
    },

    /// Bytes left over after a fixed-size value.
    #[error("expected {expected} bytes, found {actual}")]
    TrailingBytes {
        /// Bytes consumed by the layout.
        expected: u64,
        /// Bytes supplied.
        actual: u64,
    },

    /// Bit-list encoding lacks its trailing delimiter bit.
    #[error("bit-list encoding has no delimiter bit")]
    MissingDelimiter,

    /// Underlying sink or source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Byte-length bounds of a serialized type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    /// Smallest valid encoding.
    pub min: u64,
    /// Largest valid encoding.
    pub max: u64,
    /// Whether every value encodes to exactly `min == max` bytes.
    pub fixed: bool,
}

impl SizeBounds {
    /// Bounds of a type that always encodes to `size` bytes.
    pub const fn fixed(size: u64) -> Self {
        Self {
            min: size,
            max: size,
            fixed: true,
        }
    }

    /// Bounds of a variable-size type.
    pub const fn variable(min: u64, max: u64) -> Self {
        Self {
            min,
            max,
            fixed: false,
        }
    }

    /// Reject a byte region outside `[min, max]`.
    pub fn check_scope(&self, scope: u64) -> Result<(), CodecError> {
        if scope < self.min || scope > self.max {
            return Err(CodecError::Scope {
                scope,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Write one offset, rejecting values that do not fit 4 bytes.
pub fn write_offset(w: &mut dyn Write, offset: u64) -> Result<(), CodecError> {
    let value = u32::try_from(offset).map_err(|_| CodecError::OffsetOverflow { offset })?;
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Read one offset.
pub fn read_offset(r: &mut dyn Read) -> Result<u32, CodecError> {
    let mut buf = [0u8; OFFSET_BYTE_LENGTH as usize];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read exactly `scope` bytes from `r`.
pub fn read_scope(r: &mut dyn Read, scope: u64) -> Result<Vec<u8>, CodecError> {
    let len = usize::try_from(scope).map_err(|_| CodecError::Truncated {
        needed: scope,
        available: usize::MAX as u64,
    })?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

//! Two-pass fixed/variable composite encoding
//!
//! Layout: [fixed fields and offsets, in field order][variable contents, in order]
//! Each variable-size field leaves a 4-byte offset in the fixed region.

use std::io::Write;

use super::{read_offset, write_offset, CodecError, OFFSET_BYTE_LENGTH};

/// One field of a composite value, as seen by the encoder.
pub trait CompositeField {
    /// Error type of the field's own serializer.
    type Error: From<CodecError>;

    /// Encoded size when every value of the field's type has the same size.
    fn fixed_byte_length(&self) -> Option<u64>;

    /// Encoded size of this particular value.
    fn value_byte_length(&self) -> Result<u64, Self::Error>;

    /// Write the field's bytes.
    fn serialize(&self, w: &mut dyn Write) -> Result<(), Self::Error>;
}

/// Shape of one field, as seen by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    /// Always this many bytes, stored in place
    Fixed(u64),

    /// Stored after the fixed region, located through an offset
    Variable,
}

/// Offsets of the variable fields, given the fixed region length
/// (offsets included) and each variable field's encoded length.
pub fn offset_table(fixed_region: u64, variable_lengths: &[u64]) -> Result<Vec<u32>, CodecError> {
    let mut offsets = Vec::with_capacity(variable_lengths.len());
    let mut offset = fixed_region;
    for &len in variable_lengths {
        let value = u32::try_from(offset).map_err(|_| CodecError::OffsetOverflow { offset })?;
        offsets.push(value);
        if len >= 1 << 32 {
            return Err(CodecError::OffsetOverflow { offset: len });
        }
        offset += len;
    }
    // the end of the last field must still be addressable
    if offset >= 1 << 32 {
        return Err(CodecError::OffsetOverflow { offset });
    }
    Ok(offsets)
}

/// Encode `fields` in order; returns the number of bytes written.
///
/// Sizes are computed before anything is written, so an overflowing
/// layout fails without emitting partial output.
pub fn serialize_composite<F>(fields: &[F], w: &mut dyn Write) -> Result<u64, F::Error>
where
    F: CompositeField,
{
    let mut fixed_region = 0u64;
    let mut variable_lengths = Vec::new();
    for field in fields {
        match field.fixed_byte_length() {
            Some(size) => fixed_region += size,
            None => {
                fixed_region += OFFSET_BYTE_LENGTH;
                variable_lengths.push(field.value_byte_length()?);
            }
        }
    }
    let offsets = offset_table(fixed_region, &variable_lengths)?;

    let mut next_offset = offsets.iter();
    for field in fields {
        if field.fixed_byte_length().is_some() {
            field.serialize(w)?;
        } else if let Some(&offset) = next_offset.next() {
            write_offset(w, offset as u64)?;
        }
    }
    for field in fields.iter().filter(|f| f.fixed_byte_length().is_none()) {
        field.serialize(w)?;
    }

    Ok(fixed_region + variable_lengths.iter().sum::<u64>())
}

/// Slice `bytes` into per-field regions according to `layout`.
///
/// Variable regions run from their offset to the next offset, the last
/// one to the end of `bytes`.
pub fn split_composite<'b>(bytes: &'b [u8], layout: &[FieldLayout]) -> Result<Vec<&'b [u8]>, CodecError> {
    let total = bytes.len() as u64;
    let mut regions: Vec<&'b [u8]> = Vec::with_capacity(layout.len());
    // (field position, offset) for each variable field
    let mut variable = Vec::new();
    let mut pos = 0u64;

    for field in layout {
        let width = match field {
            FieldLayout::Fixed(size) => *size,
            FieldLayout::Variable => OFFSET_BYTE_LENGTH,
        };
        let end = pos + width;
        if end > total {
            return Err(CodecError::Truncated {
                needed: end,
                available: total,
            });
        }
        let region = &bytes[pos as usize..end as usize];
        match field {
            FieldLayout::Fixed(_) => regions.push(region),
            FieldLayout::Variable => {
                let mut word = region;
                variable.push((regions.len(), read_offset(&mut word)? as u64));
                regions.push(&[]);
            }
        }
        pos = end;
    }

    let fixed_region = pos;
    if variable.is_empty() {
        if fixed_region != total {
            return Err(CodecError::TrailingBytes {
                expected: fixed_region,
                actual: total,
            });
        }
        return Ok(regions);
    }

    let first = variable[0].1;
    if first != fixed_region {
        return Err(CodecError::FirstOffsetMismatch {
            offset: first,
            expected: fixed_region,
        });
    }
    for (k, &(field, start)) in variable.iter().enumerate() {
        let end = match variable.get(k + 1) {
            Some(&(_, next)) => next,
            None => total,
        };
        if end < start {
            return Err(CodecError::OffsetOutOfOrder {
                offset: end,
                previous: start,
            });
        }
        if end > total {
            return Err(CodecError::OffsetBeyondEnd {
                offset: end,
                length: total,
            });
        }
        regions[field] = &bytes[start as usize..end as usize];
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw bytes standing in for a field value
    struct Raw {
        bytes: Vec<u8>,
        fixed: bool,
    }

    impl CompositeField for Raw {
        type Error = CodecError;

        fn fixed_byte_length(&self) -> Option<u64> {
            self.fixed.then_some(self.bytes.len() as u64)
        }

        fn value_byte_length(&self) -> Result<u64, CodecError> {
            Ok(self.bytes.len() as u64)
        }

        fn serialize(&self, w: &mut dyn Write) -> Result<(), CodecError> {
            w.write_all(&self.bytes)?;
            Ok(())
        }
    }

    fn var(bytes: &[u8]) -> Raw {
        Raw {
            bytes: bytes.to_vec(),
            fixed: false,
        }
    }

    fn fixed(bytes: &[u8]) -> Raw {
        Raw {
            bytes: bytes.to_vec(),
            fixed: true,
        }
    }

    #[test]
    fn test_two_variable_fields() {
        let fields = [var(&[1, 2, 3, 4, 5]), var(&[6, 7, 8])];
        let mut out = Vec::new();
        let written = serialize_composite(&fields, &mut out).unwrap();

        assert_eq!(written, 16);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..4], &8u32.to_le_bytes());
        assert_eq!(&out[4..8], &13u32.to_le_bytes());
        assert_eq!(&out[8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_mixed_fields_keep_order() {
        let fields = [fixed(&[0xaa]), var(&[1, 2]), fixed(&[0xbb, 0xcc]), var(&[])];
        let mut out = Vec::new();
        serialize_composite(&fields, &mut out).unwrap();

        // fixed region: 1 + 4 + 2 + 4 = 11
        assert_eq!(
            out,
            vec![0xaa, 11, 0, 0, 0, 0xbb, 0xcc, 13, 0, 0, 0, 1, 2]
        );

        let layout = [
            FieldLayout::Fixed(1),
            FieldLayout::Variable,
            FieldLayout::Fixed(2),
            FieldLayout::Variable,
        ];
        let regions = split_composite(&out, &layout).unwrap();
        let expected: Vec<&[u8]> = vec![&[0xaa][..], &[1, 2][..], &[0xbb, 0xcc][..], &[][..]];
        assert_eq!(regions, expected);
    }

    #[test]
    fn test_offset_table_overflow() {
        assert_eq!(offset_table(8, &[5, 3]).unwrap(), vec![8, 13]);
        assert!(matches!(
            offset_table(4, &[u32::MAX as u64]),
            Err(CodecError::OffsetOverflow { .. })
        ));
        assert!(matches!(
            offset_table(4, &[1 << 32]),
            Err(CodecError::OffsetOverflow { .. })
        ));
    }

    #[test]
    fn test_split_rejects_bad_offsets() {
        let layout = [FieldLayout::Variable, FieldLayout::Variable];

        // first offset must equal fixed region length
        let bytes = [9, 0, 0, 0, 9, 0, 0, 0, 1];
        assert!(matches!(
            split_composite(&bytes, &layout),
            Err(CodecError::FirstOffsetMismatch { offset: 9, expected: 8 })
        ));

        let bytes = [8, 0, 0, 0, 7, 0, 0, 0, 1];
        assert!(matches!(
            split_composite(&bytes, &layout),
            Err(CodecError::OffsetOutOfOrder { .. })
        ));

        let bytes = [8, 0, 0, 0, 20, 0, 0, 0, 1];
        assert!(matches!(
            split_composite(&bytes, &layout),
            Err(CodecError::OffsetBeyondEnd { offset: 20, length: 9 })
        ));

        assert!(matches!(
            split_composite(&[8, 0, 0], &layout),
            Err(CodecError::Truncated { needed: 4, available: 3 })
        ));
    }

    #[test]
    fn test_split_fixed_only_rejects_trailing() {
        let layout = [FieldLayout::Fixed(2)];
        assert!(split_composite(&[1, 2], &layout).is_ok());
        assert!(matches!(
            split_composite(&[1, 2, 3], &layout),
            Err(CodecError::TrailingBytes { expected: 2, actual: 3 })
        ));
    }
}

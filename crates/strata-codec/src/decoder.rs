use strata_types::Hash;

use crate::error::{CodecError, CodecResult};
use crate::tag;

/// A value that can be read back from a tagged stream.
pub trait Decode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self>;
}

/// Cursor over a tagged stream. Consumes values from the front and leaves
/// everything it has not read in [`Decoder::remaining`].
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn u64(&mut self) -> CodecResult<u64> {
        self.expect_tag(tag::U64)?;
        self.raw_u64()
    }

    pub fn i64(&mut self) -> CodecResult<i64> {
        self.expect_tag(tag::I64)?;
        let bytes = self.take(8)?;
        Ok(i64::from_le_bytes(to_array(bytes)))
    }

    pub fn str(&mut self) -> CodecResult<String> {
        self.expect_tag(tag::STR)?;
        let bytes = self.length_prefixed()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidUtf8(e.to_string()))
    }

    pub fn bytes(&mut self) -> CodecResult<Vec<u8>> {
        self.expect_tag(tag::BYTES)?;
        Ok(self.length_prefixed()?.to_vec())
    }

    pub fn hash(&mut self) -> CodecResult<Hash> {
        self.expect_tag(tag::HASH)?;
        let bytes = self.take(Hash::SIZE)?;
        Ok(Hash::from_hash(to_array(bytes)))
    }

    pub fn option<T: Decode>(&mut self) -> CodecResult<Option<T>> {
        match self.tag()? {
            tag::NONE => Ok(None),
            tag::SOME => T::decode(self).map(Some),
            other => Err(unexpected("option", other)),
        }
    }

    /// Read a struct header, checking the type name and field count, and
    /// return a reader for its fields.
    pub fn structure(&mut self, name: &str, field_count: u64) -> CodecResult<FieldReader<'_, 'a>> {
        self.expect_tag(tag::STRUCT)?;
        self.expect_name(name)?;
        let found = self.raw_u64()?;
        if found != field_count {
            return Err(CodecError::FieldCount {
                name: name.to_string(),
                expected: field_count,
                found,
            });
        }
        Ok(FieldReader { dec: self })
    }

    /// Read a list whose elements are of type `element`.
    pub fn list<T: Decode>(&mut self, element: &str) -> CodecResult<Vec<T>> {
        self.expect_tag(tag::LIST)?;
        self.expect_name(element)?;
        let count = self.raw_u64()?;
        // Every element occupies at least its 8-byte length prefix; refuse
        // counts the input cannot possibly hold before allocating.
        let max = (self.data.len() / 8) as u64;
        if count > max {
            return Err(CodecError::Truncated {
                needed: count.saturating_mul(8).try_into().unwrap_or(usize::MAX),
                available: self.data.len(),
            });
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(self.delimited()?);
        }
        Ok(items)
    }

    fn tag(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn expect_tag(&mut self, expected: u8) -> CodecResult<()> {
        let found = self.tag()?;
        if found == expected {
            return Ok(());
        }
        Err(unexpected(tag::name(expected).unwrap_or("unknown"), found))
    }

    fn expect_name(&mut self, expected: &str) -> CodecResult<()> {
        let found = self.length_prefixed()?;
        if found == expected.as_bytes() {
            return Ok(());
        }
        Err(CodecError::TypeMismatch {
            expected: expected.to_string(),
            found: String::from_utf8_lossy(found).into_owned(),
        })
    }

    fn raw_u64(&mut self) -> CodecResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(to_array(bytes)))
    }

    fn length_prefixed(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.raw_u64()?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        self.take(len)
    }

    /// Decode one length-delimited value; the value must consume its whole
    /// delimited region.
    fn delimited<T: Decode>(&mut self) -> CodecResult<T> {
        let region = self.length_prefixed()?;
        let mut inner = Decoder::new(region);
        let value = T::decode(&mut inner)?;
        if !inner.is_empty() {
            return Err(CodecError::TrailingBytes(inner.data.len()));
        }
        Ok(value)
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.data.len() < n {
            return Err(CodecError::Truncated {
                needed: n,
                available: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }
}

/// Reads the length-delimited fields of a struct, in declaration order.
pub struct FieldReader<'d, 'a> {
    dec: &'d mut Decoder<'a>,
}

impl FieldReader<'_, '_> {
    pub fn field<T: Decode>(&mut self) -> CodecResult<T> {
        self.dec.delimited()
    }
}

fn unexpected(expected: &'static str, found: u8) -> CodecError {
    match tag::name(found) {
        Some(found) => CodecError::UnexpectedTag { expected, found },
        None => CodecError::UnknownTag(found),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    arr
}

impl Decode for u64 {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.u64()
    }
}

impl Decode for i64 {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.i64()
    }
}

impl Decode for String {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.str()
    }
}

impl Decode for Vec<u8> {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.bytes()
    }
}

impl Decode for Hash {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.hash()
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    #[test]
    fn decode_leaves_remaining_bytes() {
        let mut enc = Encoder::new();
        enc.u64(42);
        let mut bytes = enc.into_bytes();
        bytes.extend_from_slice(b"tail");

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.u64().unwrap(), 42);
        assert_eq!(dec.remaining(), b"tail");
    }

    #[test]
    fn truncated_scalar() {
        let err = Decoder::new(&[tag::U64, 1, 2]).u64().unwrap_err();
        assert_eq!(err, CodecError::Truncated { needed: 8, available: 2 });
    }

    #[test]
    fn empty_input_is_truncated() {
        let err = Decoder::new(&[]).hash().unwrap_err();
        assert!(matches!(err, CodecError::Truncated { needed: 1, available: 0 }));
    }

    #[test]
    fn wrong_tag_is_reported_by_name() {
        let mut enc = Encoder::new();
        enc.str("x");
        let bytes = enc.into_bytes();
        let err = Decoder::new(&bytes).u64().unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedTag { expected: "u64", found: "string" }
        );
    }

    #[test]
    fn unknown_tag() {
        let err = Decoder::new(&[0xEE]).bytes().unwrap_err();
        assert_eq!(err, CodecError::UnknownTag(0xEE));
    }

    #[test]
    fn struct_name_and_field_count_are_checked() {
        let mut enc = Encoder::new();
        enc.structure("a", |fields| {
            fields.field(&1u64);
        });
        let bytes = enc.into_bytes();

        let err = Decoder::new(&bytes).structure("b", 1).err().unwrap();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));

        let err = Decoder::new(&bytes).structure("a", 2).err().unwrap();
        assert!(matches!(err, CodecError::FieldCount { expected: 2, found: 1, .. }));
    }

    #[test]
    fn field_with_trailing_bytes_is_rejected() {
        // A struct whose single field region holds a u64 plus one stray byte.
        let mut bytes = vec![tag::STRUCT];
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(b's');
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&10u64.to_le_bytes());
        bytes.push(tag::U64);
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.push(0xAA);

        let mut dec = Decoder::new(&bytes);
        let mut fields = dec.structure("s", 1).unwrap();
        let err = fields.field::<u64>().unwrap_err();
        assert_eq!(err, CodecError::TrailingBytes(1));
    }

    #[test]
    fn list_count_larger_than_input_is_rejected() {
        let mut bytes = vec![tag::LIST];
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(b'e');
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let err = Decoder::new(&bytes).list::<u64>("e").unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn invalid_utf8() {
        let mut bytes = vec![tag::STR];
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&[0xC3, 0x28]);
        let err = Decoder::new(&bytes).str().unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8(_)));
    }
}

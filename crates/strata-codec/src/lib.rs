//! Binary value codec for Strata.
//!
//! A schema-driven encoder/decoder pair producing a self-describing,
//! type-tagged stream. Every value is prefixed with a one-byte tag from the
//! fixed table in [`tag`]; composites carry a type name, an element/field
//! count and explicit length prefixes, so a reader can skip any composite
//! without knowing its schema.
//!
//! Persisted types implement [`Encode`] and [`Decode`] by hand. Decoding
//! consumes exactly one value from the front of the input and hands back the
//! unconsumed suffix unchanged, which lets callers recover data stored
//! contiguously after an encoded entity.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod tag;

pub use decoder::{Decode, Decoder, FieldReader};
pub use encoder::{Encode, Encoder, FieldWriter};
pub use error::{CodecError, CodecResult};

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::new();
    value.encode(&mut enc);
    enc.into_bytes()
}

/// Decode one value from the front of `data`, returning it together with the
/// bytes that followed it.
pub fn from_bytes<T: Decode>(data: &[u8]) -> CodecResult<(T, &[u8])> {
    let mut dec = Decoder::new(data);
    let value = T::decode(&mut dec)?;
    Ok((value, dec.remaining()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strata_types::Hash;

    #[derive(Debug, PartialEq)]
    struct Sample {
        name: String,
        key: Hash,
        sizes: Vec<u64>,
        parent: Option<Hash>,
        payload: Vec<u8>,
        stamp: i64,
    }

    impl Encode for Sample {
        fn encode(&self, enc: &mut Encoder) {
            enc.structure("sample", |fields| {
                fields
                    .field(&self.name)
                    .field(&self.key)
                    .field(&SizeList(&self.sizes))
                    .field(&self.parent)
                    .field(&self.payload)
                    .field(&self.stamp);
            });
        }
    }

    struct SizeList<'a>(&'a [u64]);

    impl Encode for SizeList<'_> {
        fn encode(&self, enc: &mut Encoder) {
            enc.list("u64", self.0.iter());
        }
    }

    impl Decode for Sample {
        fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
            let mut fields = dec.structure("sample", 6)?;
            Ok(Self {
                name: fields.field()?,
                key: fields.field()?,
                sizes: fields.field::<SizeVec>()?.0,
                parent: fields.field()?,
                payload: fields.field()?,
                stamp: fields.field()?,
            })
        }
    }

    struct SizeVec(Vec<u64>);

    impl Decode for SizeVec {
        fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
            dec.list("u64").map(SizeVec)
        }
    }

    fn sample() -> Sample {
        Sample {
            name: "ns".into(),
            key: Hash::from_bytes(b"k"),
            sizes: vec![1, 2, 3],
            parent: None,
            payload: b"payload".to_vec(),
            stamp: -7,
        }
    }

    #[test]
    fn struct_roundtrip_with_suffix() {
        let value = sample();
        let mut bytes = to_bytes(&value);
        bytes.extend_from_slice(b"sibling data");
        let (decoded, rest) = from_bytes::<Sample>(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(rest, b"sibling data");
    }

    #[test]
    fn truncated_struct_is_rejected() {
        let bytes = to_bytes(&sample());
        for cut in [1, 9, bytes.len() / 2, bytes.len() - 1] {
            assert!(from_bytes::<Sample>(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_value_and_suffix(
            name in ".{0,16}",
            key in any::<[u8; 32]>(),
            sizes in proptest::collection::vec(any::<u64>(), 0..8),
            parent in proptest::option::of(any::<[u8; 32]>()),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            stamp in any::<i64>(),
            suffix in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let value = Sample {
                name,
                key: Hash::from_hash(key),
                sizes,
                parent: parent.map(Hash::from_hash),
                payload,
                stamp,
            };
            let mut bytes = to_bytes(&value);
            bytes.extend_from_slice(&suffix);
            let (decoded, rest) = from_bytes::<Sample>(&bytes).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(rest, &suffix[..]);
        }
    }
}

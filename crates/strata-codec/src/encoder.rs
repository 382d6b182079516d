use strata_types::Hash;

use crate::tag;

/// A value that can be written to a tagged stream.
pub trait Encode {
    fn encode(&self, enc: &mut Encoder);
}

/// Append-only writer for the tagged stream.
///
/// Layout of each encoded value:
/// ```text
/// u64 / i64     [tag][8 bytes LE]
/// string/bytes  [tag][u64 LE length][bytes]
/// hash          [tag][32 bytes]
/// option        [NONE] | [SOME][value]
/// struct        [STRUCT][u64 name len][name][u64 field count]{[u64 len][field]}*
/// list          [LIST][u64 name len][element name][u64 count]{[u64 len][element]}*
/// ```
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder and return the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.push(tag::U64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i64(&mut self, value: i64) {
        self.buf.push(tag::I64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn str(&mut self, value: &str) {
        self.buf.push(tag::STR);
        self.length_prefixed(value.as_bytes());
    }

    pub fn bytes(&mut self, value: &[u8]) {
        self.buf.push(tag::BYTES);
        self.length_prefixed(value);
    }

    pub fn hash(&mut self, value: &Hash) {
        self.buf.push(tag::HASH);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn option<T: Encode>(&mut self, value: Option<&T>) {
        match value {
            Some(inner) => {
                self.buf.push(tag::SOME);
                inner.encode(self);
            }
            None => self.buf.push(tag::NONE),
        }
    }

    /// Write a named composite. Each field is length-delimited so a reader
    /// can skip it without knowing its schema.
    pub fn structure(&mut self, name: &str, write_fields: impl FnOnce(&mut FieldWriter)) {
        let mut fields = FieldWriter::default();
        write_fields(&mut fields);
        self.buf.push(tag::STRUCT);
        self.length_prefixed(name.as_bytes());
        self.raw_u64(fields.count);
        self.buf.extend_from_slice(&fields.buf.buf);
    }

    /// Write a homogeneous list whose elements are all of type `element`.
    pub fn list<'a, T, I>(&mut self, element: &str, items: I)
    where
        T: Encode + 'a,
        I: ExactSizeIterator<Item = &'a T>,
    {
        self.buf.push(tag::LIST);
        self.length_prefixed(element.as_bytes());
        self.raw_u64(items.len() as u64);
        for item in items {
            self.delimited(|enc| item.encode(enc));
        }
    }

    fn raw_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn length_prefixed(&mut self, data: &[u8]) {
        self.raw_u64(data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    /// Encode `write` into a scratch buffer and append it with a length prefix.
    fn delimited(&mut self, write: impl FnOnce(&mut Encoder)) {
        let mut inner = Encoder::new();
        write(&mut inner);
        self.length_prefixed(&inner.buf);
    }
}

/// Collects the length-delimited fields of a struct being encoded.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Encoder,
    count: u64,
}

impl FieldWriter {
    pub fn field<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.buf.delimited(|enc| value.encode(enc));
        self.count += 1;
        self
    }
}

impl Encode for u64 {
    fn encode(&self, enc: &mut Encoder) {
        enc.u64(*self);
    }
}

impl Encode for i64 {
    fn encode(&self, enc: &mut Encoder) {
        enc.i64(*self);
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder) {
        enc.str(self);
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, enc: &mut Encoder) {
        enc.bytes(self);
    }
}

impl Encode for Hash {
    fn encode(&self, enc: &mut Encoder) {
        enc.hash(self);
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder) {
        enc.option(self.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_is_tagged_little_endian() {
        let mut enc = Encoder::new();
        enc.u64(0x0102);
        assert_eq!(enc.into_bytes(), vec![tag::U64, 0x02, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn string_carries_length_prefix() {
        let mut enc = Encoder::new();
        enc.str("ab");
        assert_eq!(
            enc.into_bytes(),
            vec![tag::STR, 2, 0, 0, 0, 0, 0, 0, 0, b'a', b'b']
        );
    }

    #[test]
    fn option_none_is_single_byte() {
        let mut enc = Encoder::new();
        enc.option::<Hash>(None);
        assert_eq!(enc.into_bytes(), vec![tag::NONE]);
    }

    #[test]
    fn struct_header_layout() {
        let mut enc = Encoder::new();
        enc.structure("t", |fields| {
            fields.field(&7u64);
        });
        let bytes = enc.into_bytes();
        assert_eq!(bytes[0], tag::STRUCT);
        // name length, name, field count
        assert_eq!(&bytes[1..9], &1u64.to_le_bytes());
        assert_eq!(bytes[9], b't');
        assert_eq!(&bytes[10..18], &1u64.to_le_bytes());
        // field length then the tagged u64
        assert_eq!(&bytes[18..26], &9u64.to_le_bytes());
        assert_eq!(bytes[26], tag::U64);
        assert_eq!(bytes.len(), 35);
    }
}

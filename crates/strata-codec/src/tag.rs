//! Fixed type-tag table.
//!
//! Every encoded value starts with one of these bytes. New tags may be added;
//! existing values never change meaning.

pub const U64: u8 = 0x01;
pub const I64: u8 = 0x02;
pub const STR: u8 = 0x03;
pub const BYTES: u8 = 0x04;
pub const HASH: u8 = 0x05;
pub const NONE: u8 = 0x06;
pub const SOME: u8 = 0x07;
pub const STRUCT: u8 = 0x10;
pub const LIST: u8 = 0x11;

/// Human-readable tag name, or `None` for a byte outside the table.
pub fn name(tag: u8) -> Option<&'static str> {
    Some(match tag {
        U64 => "u64",
        I64 => "i64",
        STR => "string",
        BYTES => "bytes",
        HASH => "hash",
        NONE => "none",
        SOME => "some",
        STRUCT => "struct",
        LIST => "list",
        _ => return None,
    })
}

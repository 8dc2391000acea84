/*!
Wire grammar shared by the decode and encode engines.

Every node is laid out as `[tag][key bytes][0x00][payload]`, and every
document or array as `[i32 length][nodes...][0x00]`, where the length counts
itself and the terminator.  All multi-byte fields are little-endian.
*/

/// Size of the `i32` length prefix of strings, binaries and documents.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Terminates keys, strings and documents.
pub const TERMINATOR: u8 = 0x00;

/// The smallest possible document: a length field and a terminator.
pub const MIN_DOCUMENT_SIZE: usize = LENGTH_FIELD_SIZE + 1;

/// The one-byte discriminator of a node's value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Boolean = 0x08,
    Null = 0x0A,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
}

impl Tag {
    /// The payload width of fixed-width kinds, `None` for length-prefixed kinds.
    pub fn fixed_payload_size(self) -> Option<usize> {
        match self {
            Tag::Double => Some(8),
            Tag::Boolean => Some(1),
            Tag::Null => Some(0),
            Tag::Int32 => Some(4),
            Tag::Int64 | Tag::Timestamp => Some(8),
            Tag::String | Tag::Document | Tag::Array | Tag::Binary => None,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Tag::Double),
            0x02 => Ok(Tag::String),
            0x03 => Ok(Tag::Document),
            0x04 => Ok(Tag::Array),
            0x05 => Ok(Tag::Binary),
            0x08 => Ok(Tag::Boolean),
            0x0A => Ok(Tag::Null),
            0x10 => Ok(Tag::Int32),
            0x11 => Ok(Tag::Timestamp),
            0x12 => Ok(Tag::Int64),
            v => Err(v),
        }
    }
}

impl From<Tag> for u8 {
    fn from(value: Tag) -> Self {
        value as u8
    }
}

impl core::fmt::Display for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub(crate) fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> Option<[u8; N]> {
    bytes
        .get(offset..offset.checked_add(N)?)
        .and_then(|b| b.try_into().ok())
}

/// Reads a little-endian `i32` at `offset`, `None` if it runs past the slice.
pub fn read_i32_le(bytes: &[u8], offset: usize) -> Option<i32> {
    read_array(bytes, offset).map(i32::from_le_bytes)
}

/// Reads a length field, rejecting negative values.
pub(crate) fn read_len(bytes: &[u8], offset: usize) -> Option<usize> {
    read_i32_le(bytes, offset).and_then(|v| usize::try_from(v).ok())
}

/// Formats `index` as the decimal key an array element is stored under.
pub fn index_key(index: usize, buf: &mut [u8; 20]) -> &str {
    let mut i = buf.len();
    let mut n = index;
    loop {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    // Only ASCII digits were written
    core::str::from_utf8(&buf[i..]).unwrap_or_default()
}

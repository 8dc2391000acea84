/*!
Mapping from logical Rust types to wire tags.

A type joins the registry by implementing [`Element`] plus any of
[`FromPayload`] (read from a buffer), [`FromEntry`] (read from a builder) and
[`IntoEntry`] (store into a builder).  Types that carry the `'a` lifetime
borrow from the buffer or builder they were read from; the others are
copied out.

Several logical types may share a tag.  A downstream crate can, for
example, read Binary payloads as null-terminated text by implementing these
traits with `TAG = Tag::Binary`, without affecting the built-in [`Binary`].
*/

use super::decode::{Array, Binary, Document};
use super::encode::{ArrayBuilder, DocumentBuilder, Entry};
use super::error::Error;
use super::tag::{self, LENGTH_FIELD_SIZE, TERMINATOR, Tag};
use alloc::{string::String, vec::Vec};

/// The BSON "generic binary" subtype used for plain byte slices.
pub const BINARY_SUBTYPE_GENERIC: u8 = 0x00;

/// The wire tag a logical type is stored under.
pub trait Element {
    const TAG: Tag;
}

/// Decode converter from the payload bytes of a node tagged `Self::TAG`.
pub trait FromPayload<'a>: Element + Sized {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error>;
}

/// Reads the same logical type back out of a builder entry.
pub trait FromEntry<'a>: Element + Sized {
    /// `None` if the entry does not hold this type.
    fn from_entry(entry: &'a Entry) -> Option<Self>;
}

/// Encode converter into a builder entry.
pub trait IntoEntry {
    fn into_entry(self) -> Entry;
}

/// The value of an Int64-layout node tagged as a Timestamp.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

/// The payload-less Null value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Null;

macro_rules! impl_fixed_width {
    ($(($ty:ty, $variant:ident)),*) => {
        $(
            impl Element for $ty {
                const TAG: Tag = Tag::$variant;
            }

            impl<'a> FromPayload<'a> for $ty {
                fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
                    tag::read_array(payload, 0)
                        .map(<$ty>::from_le_bytes)
                        .ok_or(Error::MalformedDocument)
                }
            }

            impl<'a> FromEntry<'a> for $ty {
                fn from_entry(entry: &'a Entry) -> Option<Self> {
                    match entry {
                        Entry::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl IntoEntry for $ty {
                fn into_entry(self) -> Entry {
                    Entry::$variant(self)
                }
            }
        )*
    };
}

impl_fixed_width!((f64, Double), (i32, Int32), (i64, Int64));

impl Element for Timestamp {
    const TAG: Tag = Tag::Timestamp;
}

impl<'a> FromPayload<'a> for Timestamp {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        i64::from_payload(payload).map(Timestamp)
    }
}

impl<'a> FromEntry<'a> for Timestamp {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Timestamp(v) => Some(Timestamp(*v)),
            _ => None,
        }
    }
}

impl IntoEntry for Timestamp {
    fn into_entry(self) -> Entry {
        Entry::Timestamp(self.0)
    }
}

impl Element for bool {
    const TAG: Tag = Tag::Boolean;
}

impl<'a> FromPayload<'a> for bool {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        payload
            .first()
            .map(|b| *b != 0)
            .ok_or(Error::MalformedDocument)
    }
}

impl<'a> FromEntry<'a> for bool {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl IntoEntry for bool {
    fn into_entry(self) -> Entry {
        Entry::Boolean(self)
    }
}

impl Element for Null {
    const TAG: Tag = Tag::Null;
}

impl<'a> FromPayload<'a> for Null {
    fn from_payload(_payload: &'a [u8]) -> Result<Self, Error> {
        Ok(Null)
    }
}

impl<'a> FromEntry<'a> for Null {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        matches!(entry, Entry::Null).then_some(Null)
    }
}

impl IntoEntry for Null {
    fn into_entry(self) -> Entry {
        Entry::Null
    }
}

impl Element for &str {
    const TAG: Tag = Tag::String;
}

impl<'a> FromPayload<'a> for &'a str {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        let len = tag::read_len(payload, 0)
            .filter(|len| *len >= 1)
            .ok_or(Error::MalformedDocument)?;
        let end = LENGTH_FIELD_SIZE + len - 1;
        if payload.get(end) != Some(&TERMINATOR) {
            return Err(Error::MalformedDocument);
        }
        core::str::from_utf8(&payload[LENGTH_FIELD_SIZE..end]).map_err(|_| Error::MalformedDocument)
    }
}

impl<'a> FromEntry<'a> for &'a str {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl IntoEntry for &str {
    fn into_entry(self) -> Entry {
        Entry::String(self.into())
    }
}

impl Element for String {
    const TAG: Tag = Tag::String;
}

impl IntoEntry for String {
    fn into_entry(self) -> Entry {
        Entry::String(self)
    }
}

impl Element for Binary<'_> {
    const TAG: Tag = Tag::Binary;
}

impl<'a> FromPayload<'a> for Binary<'a> {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        let len = tag::read_len(payload, 0).ok_or(Error::MalformedDocument)?;
        let subtype = *payload
            .get(LENGTH_FIELD_SIZE)
            .ok_or(Error::MalformedDocument)?;
        let start = LENGTH_FIELD_SIZE + 1;
        let data = start
            .checked_add(len)
            .and_then(|end| payload.get(start..end))
            .ok_or(Error::MalformedDocument)?;
        Ok(Binary { subtype, data })
    }
}

impl<'a> FromEntry<'a> for Binary<'a> {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Binary { subtype, data } => Some(Binary {
                subtype: *subtype,
                data,
            }),
            _ => None,
        }
    }
}

impl IntoEntry for Binary<'_> {
    fn into_entry(self) -> Entry {
        Entry::Binary {
            subtype: self.subtype,
            data: self.data.to_vec(),
        }
    }
}

impl Element for &[u8] {
    const TAG: Tag = Tag::Binary;
}

impl IntoEntry for &[u8] {
    fn into_entry(self) -> Entry {
        Entry::Binary {
            subtype: BINARY_SUBTYPE_GENERIC,
            data: self.to_vec(),
        }
    }
}

impl Element for Vec<u8> {
    const TAG: Tag = Tag::Binary;
}

impl IntoEntry for Vec<u8> {
    fn into_entry(self) -> Entry {
        Entry::Binary {
            subtype: BINARY_SUBTYPE_GENERIC,
            data: self,
        }
    }
}

impl Element for Document<'_> {
    const TAG: Tag = Tag::Document;
}

impl<'a> FromPayload<'a> for Document<'a> {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        Ok(Document::new(payload))
    }
}

impl Element for Array<'_> {
    const TAG: Tag = Tag::Array;
}

impl<'a> FromPayload<'a> for Array<'a> {
    fn from_payload(payload: &'a [u8]) -> Result<Self, Error> {
        Ok(Array::new(payload))
    }
}

impl Element for DocumentBuilder {
    const TAG: Tag = Tag::Document;
}

impl Element for &DocumentBuilder {
    const TAG: Tag = Tag::Document;
}

impl<'a> FromEntry<'a> for &'a DocumentBuilder {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Document(d) => Some(d),
            _ => None,
        }
    }
}

impl IntoEntry for DocumentBuilder {
    fn into_entry(self) -> Entry {
        Entry::Document(self)
    }
}

impl Element for ArrayBuilder {
    const TAG: Tag = Tag::Array;
}

impl Element for &ArrayBuilder {
    const TAG: Tag = Tag::Array;
}

impl<'a> FromEntry<'a> for &'a ArrayBuilder {
    fn from_entry(entry: &'a Entry) -> Option<Self> {
        match entry {
            Entry::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl IntoEntry for ArrayBuilder {
    fn into_entry(self) -> Entry {
        Entry::Array(self)
    }
}

impl IntoEntry for Entry {
    fn into_entry(self) -> Entry {
        self
    }
}

impl<T> IntoEntry for Option<T>
where
    T: IntoEntry,
{
    fn into_entry(self) -> Entry {
        match self {
            Some(value) => value.into_entry(),
            None => Entry::Null,
        }
    }
}

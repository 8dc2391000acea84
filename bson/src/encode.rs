/*!
Owning, insertion-ordered builders that serialize to the wire format.

A builder can be queried with the same `get`/`contains` contract as a decoded
[`Document`], serialized any number of times, and mutated again afterwards.
*/

use super::decode::{Array, Binary, Document, Node};
use super::error::Error;
use super::registry::{Element, FromEntry, IntoEntry, Timestamp};
use super::tag::{LENGTH_FIELD_SIZE, MIN_DOCUMENT_SIZE, TERMINATOR, Tag};
use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};
use tracing::*;

/// An owned value held by a builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Double(f64),
    String(String),
    Document(DocumentBuilder),
    Array(ArrayBuilder),
    Binary { subtype: u8, data: Vec<u8> },
    Boolean(bool),
    Null,
    Int32(i32),
    Timestamp(i64),
    Int64(i64),
}

impl Entry {
    pub fn tag(&self) -> Tag {
        match self {
            Entry::Double(_) => Tag::Double,
            Entry::String(_) => Tag::String,
            Entry::Document(_) => Tag::Document,
            Entry::Array(_) => Tag::Array,
            Entry::Binary { .. } => Tag::Binary,
            Entry::Boolean(_) => Tag::Boolean,
            Entry::Null => Tag::Null,
            Entry::Int32(_) => Tag::Int32,
            Entry::Timestamp(_) => Tag::Timestamp,
            Entry::Int64(_) => Tag::Int64,
        }
    }

    /// Encoded size of the value, excluding the tag and key.
    pub fn payload_size(&self) -> usize {
        match self {
            Entry::String(s) => LENGTH_FIELD_SIZE + s.len() + 1,
            Entry::Document(d) => d.computed_size(),
            Entry::Array(a) => a.computed_size(),
            Entry::Binary { data, .. } => LENGTH_FIELD_SIZE + 1 + data.len(),
            Entry::Double(_)
            | Entry::Boolean(_)
            | Entry::Null
            | Entry::Int32(_)
            | Entry::Timestamp(_)
            | Entry::Int64(_) => self.tag().fixed_payload_size().unwrap_or_default(),
        }
    }

    fn node_size(&self, key: &str) -> usize {
        1 + key.len() + 1 + self.payload_size()
    }

    fn write_payload(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Entry::Double(v) => w.put(&v.to_le_bytes()),
            Entry::String(s) => {
                w.put_len(s.len() + 1)?;
                w.put(s.as_bytes())?;
                w.put(&[TERMINATOR])
            }
            Entry::Document(d) => d.write(w),
            Entry::Array(a) => a.inner.write(w),
            Entry::Binary { subtype, data } => {
                w.put_len(data.len())?;
                w.put(&[*subtype])?;
                w.put(data)
            }
            Entry::Boolean(v) => w.put(&[u8::from(*v)]),
            Entry::Null => Ok(()),
            Entry::Int32(v) => w.put(&v.to_le_bytes()),
            Entry::Timestamp(v) | Entry::Int64(v) => w.put(&v.to_le_bytes()),
        }
    }

    fn cast<'a, T: FromEntry<'a>>(&'a self) -> Result<T, Error> {
        let bad_cast = Error::BadCast {
            expected: T::TAG,
            found: self.tag().into(),
        };
        if self.tag() != T::TAG {
            return Err(bad_cast);
        }
        T::from_entry(self).ok_or(bad_cast)
    }
}

impl TryFrom<Node<'_>> for Entry {
    type Error = Error;

    fn try_from(node: Node<'_>) -> Result<Self, Self::Error> {
        Ok(match node.kind().ok_or(Error::MalformedDocument)? {
            Tag::Double => Entry::Double(node.value()?),
            Tag::String => Entry::String(node.value::<&str>()?.into()),
            Tag::Document => Entry::Document(node.as_document()?.try_into()?),
            Tag::Array => Entry::Array(node.as_array()?.try_into()?),
            Tag::Binary => node.value::<Binary>()?.into_entry(),
            Tag::Boolean => Entry::Boolean(node.value()?),
            Tag::Null => Entry::Null,
            Tag::Int32 => Entry::Int32(node.value()?),
            Tag::Timestamp => Entry::Timestamp(node.value::<Timestamp>()?.0),
            Tag::Int64 => Entry::Int64(node.value()?),
        })
    }
}

struct Writer<'b> {
    target: &'b mut [u8],
    offset: usize,
}

impl<'b> Writer<'b> {
    fn new(target: &'b mut [u8]) -> Self {
        Self { target, offset: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.offset + bytes.len();
        let actual = self.target.len();
        self.target
            .get_mut(self.offset..end)
            .ok_or(Error::CapacityMismatch {
                expected: end,
                actual,
            })?
            .copy_from_slice(bytes);
        self.offset = end;
        Ok(())
    }

    fn encode_len(len: usize) -> Result<[u8; LENGTH_FIELD_SIZE], Error> {
        i32::try_from(len)
            .map(i32::to_le_bytes)
            .map_err(|_| Error::DocumentTooLarge(len))
    }

    fn put_len(&mut self, len: usize) -> Result<(), Error> {
        self.put(&Self::encode_len(len)?)
    }

    /// Overwrites the length field written at `at`.
    fn patch_len(&mut self, at: usize, len: usize) -> Result<(), Error> {
        let bytes = Self::encode_len(len)?;
        let actual = self.target.len();
        self.target
            .get_mut(at..at + LENGTH_FIELD_SIZE)
            .ok_or(Error::CapacityMismatch {
                expected: at + LENGTH_FIELD_SIZE,
                actual,
            })?
            .copy_from_slice(&bytes);
        Ok(())
    }
}

/// An insertion-ordered mapping from key to [`Entry`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocumentBuilder {
    entries: Vec<(String, Entry)>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Appends `key`, or replaces its value in place if it already exists.
    ///
    /// The replacement need not have the same type as the old value.
    pub fn set<V: IntoEntry>(&mut self, key: &str, value: V) -> &mut Self {
        let entry = value.into_entry();
        match self.position(key) {
            Some(idx) => self.entries[idx].1 = entry,
            None => self.entries.push((key.to_string(), entry)),
        }
        self
    }

    /// Consuming form of [`set`](Self::set), for building nested documents inline.
    pub fn with<V: IntoEntry>(mut self, key: &str, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn set_null(&mut self, key: &str) -> &mut Self {
        self.set(key, Entry::Null)
    }

    /// Removes `key`, returning whether it was present.
    pub fn erase(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get<'a, T: FromEntry<'a>>(&'a self, key: &str) -> Result<T, Error> {
        self.entry(key).ok_or(Error::OutOfRange)?.cast()
    }

    pub fn get_or<'a, T: FromEntry<'a>>(&'a self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn contains<T: Element>(&self, key: &str) -> bool {
        self.entry(key).is_some_and(|e| e.tag() == T::TAG)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// The exact number of bytes [`serialize`](Self::serialize) will write.
    pub fn computed_size(&self) -> usize {
        MIN_DOCUMENT_SIZE
            + self
                .entries
                .iter()
                .map(|(k, e)| e.node_size(k))
                .sum::<usize>()
    }

    fn check_keys(&self) -> Result<(), Error> {
        for (key, entry) in &self.entries {
            if key.is_empty() || key.as_bytes().contains(&TERMINATOR) {
                debug!("Key {key:?} cannot be encoded");
                return Err(Error::InvalidKey);
            }
            match entry {
                Entry::Document(d) => d.check_keys()?,
                Entry::Array(a) => a.inner.check_keys()?,
                _ => {}
            }
        }
        Ok(())
    }

    fn write(&self, w: &mut Writer) -> Result<(), Error> {
        // The length is patched once the children are written
        let start = w.offset;
        w.put(&[0; LENGTH_FIELD_SIZE])?;
        for (key, entry) in &self.entries {
            w.put(&[entry.tag().into()])?;
            w.put(key.as_bytes())?;
            w.put(&[TERMINATOR])?;
            entry.write_payload(w)?;
        }
        w.put(&[TERMINATOR])?;
        w.patch_len(start, w.offset - start)
    }

    /// Writes the document into `target`, which must be exactly
    /// [`computed_size`](Self::computed_size) bytes long.
    ///
    /// Every key, including those of nested builders, must be non-empty and
    /// free of `0x00` bytes, or the call fails with [`Error::InvalidKey`].
    /// No byte is written when any check fails.
    pub fn serialize(&self, target: &mut [u8]) -> Result<usize, Error> {
        let expected = self.computed_size();
        if target.len() != expected {
            debug!(
                "Serialization target is {} bytes, document needs {expected}",
                target.len()
            );
            return Err(Error::CapacityMismatch {
                expected,
                actual: target.len(),
            });
        }
        if i32::try_from(expected).is_err() {
            return Err(Error::DocumentTooLarge(expected));
        }
        self.check_keys()?;

        let mut w = Writer::new(target);
        self.write(&mut w)?;
        trace!("Serialized {} entries into {} bytes", self.len(), w.offset);
        Ok(w.offset)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut data = vec![0u8; self.computed_size()];
        self.serialize(&mut data)?;
        Ok(data)
    }
}

impl TryFrom<Document<'_>> for DocumentBuilder {
    type Error = Error;

    /// Deep-copies a decoded document.
    fn try_from(document: Document<'_>) -> Result<Self, Self::Error> {
        let mut builder = DocumentBuilder::new();
        for node in document {
            let node = node?;
            builder
                .entries
                .push((node.key().to_string(), Entry::try_from(node)?));
        }
        Ok(builder)
    }
}

/// A document builder whose keys are always `"0"` to `"len - 1"`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArrayBuilder {
    inner: DocumentBuilder,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push_back<V: IntoEntry>(&mut self, value: V) -> &mut Self {
        let key = self.inner.len().to_string();
        self.inner.entries.push((key, value.into_entry()));
        self
    }

    pub fn with<V: IntoEntry>(mut self, value: V) -> Self {
        self.push_back(value);
        self
    }

    /// Replaces the element at `index`, which must already exist.
    pub fn set<V: IntoEntry>(&mut self, index: usize, value: V) -> Result<&mut Self, Error> {
        self.inner
            .entries
            .get_mut(index)
            .ok_or(Error::OutOfRange)?
            .1 = value.into_entry();
        Ok(self)
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.inner.entries.get(index).map(|(_, e)| e)
    }

    pub fn get<'a, T: FromEntry<'a>>(&'a self, index: usize) -> Result<T, Error> {
        self.entry(index).ok_or(Error::OutOfRange)?.cast()
    }

    pub fn get_or<'a, T: FromEntry<'a>>(&'a self, index: usize, default: T) -> T {
        self.get(index).unwrap_or(default)
    }

    pub fn contains<T: Element>(&self, index: usize) -> bool {
        self.entry(index).is_some_and(|e| e.tag() == T::TAG)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.inner.entries.iter().map(|(_, e)| e)
    }

    pub fn as_document(&self) -> &DocumentBuilder {
        &self.inner
    }

    pub fn computed_size(&self) -> usize {
        self.inner.computed_size()
    }

    pub fn serialize(&self, target: &mut [u8]) -> Result<usize, Error> {
        self.inner.serialize(target)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        self.inner.to_vec()
    }
}

impl TryFrom<Array<'_>> for ArrayBuilder {
    type Error = Error;

    /// Deep-copies a decoded array, renumbering its keys by position.
    fn try_from(array: Array<'_>) -> Result<Self, Self::Error> {
        let mut builder = ArrayBuilder::new();
        for node in array {
            builder.push_back(Entry::try_from(node?)?);
        }
        Ok(builder)
    }
}

impl<V: IntoEntry> FromIterator<V> for ArrayBuilder {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut builder = ArrayBuilder::new();
        for value in iter {
            builder.push_back(value);
        }
        builder
    }
}

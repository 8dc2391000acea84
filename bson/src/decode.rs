/*!
Zero-copy views over an encoded buffer.

Nothing here allocates or copies: `Node`, `Document` and `Array` borrow the
caller's bytes for `'a`, and every value read through the registry either
borrows from the same bytes or is a small `Copy` scalar.
*/

use super::error::Error;
use super::registry::{Element, FromPayload};
use super::tag::{self, LENGTH_FIELD_SIZE, MIN_DOCUMENT_SIZE, TERMINATOR, Tag};
use core::iter::FusedIterator;
use tracing::*;

/// A view of one `[tag][key][0x00][payload]` node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    bytes: &'a [u8],
}

impl<'a> Node<'a> {
    /// Wraps `bytes`, which must start at a tag byte.  Nothing is validated.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The sentinel returned for missing nodes.
    pub const fn empty() -> Self {
        Self { bytes: &[] }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn raw_tag(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// `None` for the empty node and for unrecognized tags.
    pub fn kind(&self) -> Option<Tag> {
        self.raw_tag().and_then(|t| Tag::try_from(t).ok())
    }

    pub fn key_bytes(&self) -> &'a [u8] {
        let rest = self.bytes.get(1..).unwrap_or_default();
        let end = rest
            .iter()
            .position(|b| *b == TERMINATOR)
            .unwrap_or(rest.len());
        &rest[..end]
    }

    /// The node's key, or `""` if the key is not valid UTF-8.
    pub fn key(&self) -> &'a str {
        core::str::from_utf8(self.key_bytes()).unwrap_or_default()
    }

    fn header_size(&self) -> usize {
        1 + self.key_bytes().len() + 1
    }

    fn compute_size(&self) -> Option<usize> {
        let kind = self.kind()?;
        let header = self.header_size();
        if self.bytes.get(header - 1) != Some(&TERMINATOR) {
            return None;
        }

        let payload = match kind.fixed_payload_size() {
            Some(width) => width,
            None => {
                let len = tag::read_len(self.bytes, header)?;
                match kind {
                    Tag::String if len >= 1 => LENGTH_FIELD_SIZE.checked_add(len)?,
                    Tag::Binary => (LENGTH_FIELD_SIZE + 1).checked_add(len)?,
                    Tag::Document | Tag::Array if len >= MIN_DOCUMENT_SIZE => len,
                    _ => return None,
                }
            }
        };

        let size = header.checked_add(payload)?;
        (size <= self.bytes.len()).then_some(size)
    }

    /// Total encoded length of the node, or 0 if it cannot be sized.
    ///
    /// 0 is never a valid node length: it marks an unrecognized tag, a
    /// missing key terminator, a negative length field or data running past
    /// the end of the buffer.
    pub fn size(&self) -> usize {
        self.compute_size().unwrap_or(0)
    }

    pub fn try_size(&self) -> Result<usize, Error> {
        self.compute_size().ok_or(Error::MalformedDocument)
    }

    /// The payload bytes, empty when the node cannot be sized.
    pub fn payload(&self) -> &'a [u8] {
        self.bytes
            .get(self.header_size()..self.size())
            .unwrap_or_default()
    }

    /// Reads the node's value as `T`.
    pub fn value<T: FromPayload<'a>>(&self) -> Result<T, Error> {
        let raw = self.raw_tag().ok_or(Error::OutOfRange)?;
        if raw != u8::from(T::TAG) {
            return Err(Error::BadCast {
                expected: T::TAG,
                found: raw,
            });
        }
        let end = self.try_size()?;
        T::from_payload(&self.bytes[self.header_size()..end])
    }

    pub fn as_document(&self) -> Result<Document<'a>, Error> {
        self.value()
    }

    pub fn as_array(&self) -> Result<Array<'a>, Error> {
        self.value()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// A view of a `[i32 length][nodes...][0x00]` region.
///
/// This is either a whole buffer produced by
/// [`DocumentBuilder::serialize`](crate::encode::DocumentBuilder::serialize)
/// or the payload of a nested Document node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    bytes: &'a [u8],
}

impl<'a> Document<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The declared length, 0 if the length field is missing or negative.
    pub fn size(&self) -> usize {
        tag::read_len(self.bytes, 0).unwrap_or(0)
    }

    /// Checks the declared length and the final terminator.
    ///
    /// Nested length fields are not checked, so a document that passes may
    /// still stop with [`Error::MalformedDocument`] during iteration.
    pub fn validate(&self, expected_size: Option<usize>) -> bool {
        let Some(declared) = tag::read_len(self.bytes, 0) else {
            debug!("Document has no valid length field");
            return false;
        };
        if declared < MIN_DOCUMENT_SIZE {
            debug!("Document declares {declared} bytes, less than the minimum");
            return false;
        }
        if let Some(expected) = expected_size {
            if expected != declared {
                debug!("Document declares {declared} bytes, expected {expected}");
                return false;
            }
        }
        match self.bytes.get(declared - 1) {
            Some(&TERMINATOR) => true,
            Some(b) => {
                debug!("Document terminator is {b:#04x}");
                false
            }
            None => {
                debug!(
                    "Document declares {declared} bytes, but only {} are available",
                    self.bytes.len()
                );
                false
            }
        }
    }

    pub fn iter(&self) -> Iter<'a> {
        Iter::new(self.bytes)
    }

    /// Finds the first node with `key`.  Malformed data is treated as absence.
    pub fn lookup(&self, key: &str) -> Option<Node<'a>> {
        self.iter()
            .map_while(Result::ok)
            .find(|node| node.key_bytes() == key.as_bytes())
    }

    pub fn lookup_kind(&self, key: &str, kind: Tag) -> Option<Node<'a>> {
        self.iter()
            .map_while(Result::ok)
            .find(|node| node.key_bytes() == key.as_bytes() && node.kind() == Some(kind))
    }

    fn find(&self, key: &str) -> Result<Node<'a>, Error> {
        for node in self.iter() {
            let node = node?;
            if node.key_bytes() == key.as_bytes() {
                return Ok(node);
            }
        }
        Err(Error::OutOfRange)
    }

    pub fn get<T: FromPayload<'a>>(&self, key: &str) -> Result<T, Error> {
        self.find(key)?.value()
    }

    pub fn get_or<T: FromPayload<'a>>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn contains<T: Element>(&self, key: &str) -> bool {
        self.lookup(key)
            .is_some_and(|node| node.raw_tag() == Some(u8::from(T::TAG)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Number of well-formed nodes before the end or the first corruption.
    pub fn len(&self) -> usize {
        self.iter().map_while(Result::ok).count()
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self.iter().next(), Some(Ok(_)))
    }
}

impl<'a> IntoIterator for Document<'a> {
    type Item = Result<Node<'a>, Error>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Document<'a> {
    type Item = Result<Node<'a>, Error>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward walk over the child nodes of a document.
///
/// Yields a single `Err(MalformedDocument)` and then ends when a node cannot
/// be sized or overruns its parent.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    nodes: &'a [u8],
    offset: usize,
    state: IterState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Walking,
    Malformed,
    Done,
}

impl<'a> Iter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        let (nodes, state) = if bytes.is_empty() {
            (&[][..], IterState::Done)
        } else {
            match tag::read_len(bytes, 0) {
                Some(declared) if declared >= MIN_DOCUMENT_SIZE && declared <= bytes.len() => {
                    (&bytes[LENGTH_FIELD_SIZE..declared - 1], IterState::Walking)
                }
                _ => (&[][..], IterState::Malformed),
            }
        };
        Self {
            nodes,
            offset: 0,
            state,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<Node<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            IterState::Done => return None,
            IterState::Malformed => {
                debug!("Document length field is invalid");
                self.state = IterState::Done;
                return Some(Err(Error::MalformedDocument));
            }
            IterState::Walking => {}
        }

        if self.offset >= self.nodes.len() {
            self.state = IterState::Done;
            return None;
        }

        let nodes = self.nodes;
        let rest = &nodes[self.offset..];
        match Node::new(rest).compute_size() {
            Some(size) => {
                self.offset += size;
                Some(Ok(Node::new(&rest[..size])))
            }
            None => {
                debug!(
                    "Malformed node at offset {} with tag {:#04x}",
                    LENGTH_FIELD_SIZE + self.offset,
                    rest[0]
                );
                self.state = IterState::Done;
                Some(Err(Error::MalformedDocument))
            }
        }
    }
}

impl FusedIterator for Iter<'_> {}

/// A document whose keys are the decimal indices `"0"`, `"1"`, ...
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Array<'a> {
    document: Document<'a>,
}

impl<'a> Array<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            document: Document::new(bytes),
        }
    }

    pub fn as_document(&self) -> Document<'a> {
        self.document
    }

    pub fn size(&self) -> usize {
        self.document.size()
    }

    pub fn validate(&self, expected_size: Option<usize>) -> bool {
        self.document.validate(expected_size)
    }

    pub fn iter(&self) -> Iter<'a> {
        self.document.iter()
    }

    pub fn lookup(&self, index: usize) -> Option<Node<'a>> {
        let mut buf = [0u8; 20];
        self.document.lookup(tag::index_key(index, &mut buf))
    }

    pub fn get<T: FromPayload<'a>>(&self, index: usize) -> Result<T, Error> {
        let mut buf = [0u8; 20];
        self.document.get(tag::index_key(index, &mut buf))
    }

    pub fn get_or<T: FromPayload<'a>>(&self, index: usize, default: T) -> T {
        self.get(index).unwrap_or(default)
    }

    pub fn contains<T: Element>(&self, index: usize) -> bool {
        let mut buf = [0u8; 20];
        self.document.contains::<T>(tag::index_key(index, &mut buf))
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }
}

impl<'a> IntoIterator for Array<'a> {
    type Item = Result<Node<'a>, Error>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A borrowed Binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binary<'a> {
    pub subtype: u8,
    pub data: &'a [u8],
}

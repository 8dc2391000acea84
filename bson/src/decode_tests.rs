use super::decode::*;
use super::error::Error;
use super::registry::{Null, Timestamp};
use super::tag::Tag;
use alloc::vec::Vec;
use hex_literal::hex;

const INT32_X: [u8; 12] = hex!("0c000000 10 7800 01000000 00");
const HELLO_WORLD: [u8; 22] = hex!("16000000 02 68656c6c6f00 06000000 776f726c6400 00");
const NESTED: [u8; 20] = hex!("14000000 03 6400 09000000 08 6100 01 00 0a 6e00 00");
const ARRAY: [u8; 21] = hex!("15000000 02 3000 02000000 6100 10 3100 05000000 00");

#[test]
fn scalar_nodes() {
    let doc = Document::new(&INT32_X);
    assert!(doc.validate(None));
    assert!(doc.validate(Some(12)));
    assert_eq!(doc.size(), 12);
    assert_eq!(doc.len(), 1);

    let node = doc.iter().next().unwrap().unwrap();
    assert_eq!(node.kind(), Some(Tag::Int32));
    assert_eq!(node.key(), "x");
    assert_eq!(node.size(), 7);
    assert_eq!(node.payload(), &hex!("01000000"));
    assert_eq!(node.value::<i32>(), Ok(1));
    assert_eq!(doc.get::<i32>("x"), Ok(1));

    let data = hex!("10000000 01 6600 000000000000f83f 00");
    let doc = Document::new(&data);
    assert_eq!(doc.get::<f64>("f"), Ok(1.5));

    let data = hex!("1b000000 12 6900 ffffffffffffffff 11 7400 0700000000000000 00");
    let doc = Document::new(&data);
    assert!(doc.validate(Some(27)));
    assert_eq!(doc.get::<i64>("i"), Ok(-1));
    assert_eq!(doc.get::<Timestamp>("t"), Ok(Timestamp(7)));
}

#[test]
fn string_nodes() {
    let data = HELLO_WORLD;
    let doc = Document::new(&data);
    assert!(doc.validate(Some(data.len())));

    let node = doc.lookup("hello").unwrap();
    assert_eq!(node.kind(), Some(Tag::String));
    assert_eq!(node.size(), 17);
    assert_eq!(doc.get::<&str>("hello"), Ok("world"));

    // The returned text points into the buffer
    let text: &str = doc.get("hello").unwrap();
    assert!(data.as_ptr_range().contains(&text.as_ptr()));

    let data = hex!("0d000000 02 6500 01000000 00 00");
    let empty = Document::new(&data);
    assert_eq!(empty.get::<&str>("e"), Ok(""));
}

#[test]
fn binary_nodes() {
    let data = hex!("10000000 05 6200 03000000 80 010203 00");
    let doc = Document::new(&data);
    assert!(doc.validate(None));

    let bin = doc.get::<Binary>("b").unwrap();
    assert_eq!(bin.subtype, 0x80);
    assert_eq!(bin.data, &[1, 2, 3]);
    assert_eq!(doc.lookup("b").unwrap().size(), 11);
}

#[test]
fn nested_nodes() {
    let doc = Document::new(&NESTED);
    assert!(doc.validate(Some(20)));
    assert_eq!(doc.len(), 2);

    let d = doc.get::<Document>("d").unwrap();
    assert_eq!(d.size(), 9);
    assert!(d.validate(None));
    assert_eq!(d.get::<bool>("a"), Ok(true));
    assert_eq!(doc.lookup("d").unwrap().size(), 12);

    assert_eq!(doc.get::<Null>("n"), Ok(Null));
    assert_eq!(doc.lookup("n").unwrap().size(), 3);
    assert!(doc.lookup("n").unwrap().payload().is_empty());
}

#[test]
fn array_nodes() {
    let arr = Array::new(&ARRAY);
    assert!(arr.validate(None));
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.get::<&str>(0), Ok("a"));
    assert_eq!(arr.get::<i32>(1), Ok(5));
    assert_eq!(arr.get::<i32>(2), Err(Error::OutOfRange));
    assert!(arr.contains::<&str>(0));
    assert!(!arr.contains::<&str>(1));

    let keys: Vec<&str> = arr.iter().map(|n| n.unwrap().key()).collect();
    assert_eq!(keys, ["0", "1"]);
}

#[test]
fn iteration_is_restartable() {
    let doc = Document::new(&NESTED);
    let iter = doc.iter();
    let first: Vec<_> = iter.clone().map(|n| n.unwrap().key()).collect();
    let second: Vec<_> = doc.iter().map(|n| n.unwrap().key()).collect();
    assert_eq!(first, ["d", "n"]);
    assert_eq!(first, second);
    assert_eq!(iter.count(), 2);
}

#[test]
fn lookup_by_kind() {
    let doc = Document::new(&NESTED);
    assert!(doc.lookup_kind("d", Tag::Document).is_some());
    assert!(doc.lookup_kind("d", Tag::Array).is_none());
    assert!(doc.lookup("missing").is_none());
    assert!(doc.contains_key("n"));
    assert!(!doc.contains_key("missing"));
}

#[test]
fn absence_and_mismatch() {
    let doc = Document::new(&NESTED);

    assert!(!doc.contains::<i32>("missing"));
    assert_eq!(doc.get::<i32>("missing"), Err(Error::OutOfRange));

    assert!(doc.contains::<Document>("d"));
    assert!(!doc.contains::<Array>("d"));
    assert_eq!(
        doc.get::<i32>("d"),
        Err(Error::BadCast {
            expected: Tag::Int32,
            found: 0x03
        })
    );
    assert!(doc.lookup("d").unwrap().as_array().is_err());

    assert_eq!(doc.get_or("missing", 42i32), 42);
    assert_eq!(doc.get_or("d", 42i32), 42);
}

#[test]
fn int64_and_timestamp_are_distinct() {
    let data = hex!("1b000000 12 6900 ffffffffffffffff 11 7400 0700000000000000 00");
    let doc = Document::new(&data);
    assert!(doc.contains::<i64>("i"));
    assert!(!doc.contains::<Timestamp>("i"));
    assert!(doc.contains::<Timestamp>("t"));
    assert!(matches!(doc.get::<i64>("t"), Err(Error::BadCast { .. })));
    assert!(matches!(doc.get::<Timestamp>("i"), Err(Error::BadCast { .. })));
}

#[test]
fn empty_document() {
    let data = hex!("05000000 00");
    let doc = Document::new(&data);
    assert!(doc.validate(Some(5)));
    assert!(doc.is_empty());
    assert_eq!(doc.len(), 0);
    assert!(doc.iter().next().is_none());
}

#[test]
fn null_sentinels() {
    let node = Node::empty();
    assert!(node.is_empty());
    assert_eq!(node.kind(), None);
    assert_eq!(node.key(), "");
    assert_eq!(node.size(), 0);
    assert_eq!(node.value::<i32>(), Err(Error::OutOfRange));

    let doc = Document::default();
    assert!(!doc.validate(None));
    assert!(doc.iter().next().is_none());
    assert!(doc.lookup("x").is_none());
}

#[test]
fn unsizable_nodes() {
    // Unknown tag
    assert_eq!(Node::new(&hex!("07 6100 000000000000000000000000")).size(), 0);
    // Key without terminator
    assert_eq!(Node::new(b"\x10ab").size(), 0);
    // Negative string length
    assert_eq!(Node::new(&hex!("02 6100 ffffffff 00")).size(), 0);
    // Zero string length, which cannot hold the terminator
    assert_eq!(Node::new(&hex!("02 6100 00000000 00")).size(), 0);
    // Truncated int32
    assert_eq!(Node::new(&hex!("10 6100 0100")).size(), 0);
    // Document shorter than its own framing
    assert_eq!(Node::new(&hex!("03 6400 04000000")).size(), 0);

    assert_eq!(
        Node::new(&hex!("07 6100 00")).try_size(),
        Err(Error::MalformedDocument)
    );
}

#[test]
fn malformed_node_stops_iteration() {
    let mut data = hex!("13000000 10 7800 01000000 10 7900 02000000 00");
    assert_eq!(Document::new(&data).get::<i32>("y"), Ok(2));

    data[11] = 0x07;
    let doc = Document::new(&data);
    assert!(doc.validate(None));

    let mut iter = doc.iter();
    assert_eq!(iter.next().unwrap().unwrap().key(), "x");
    assert_eq!(iter.next(), Some(Err(Error::MalformedDocument)));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next(), None);

    assert_eq!(doc.len(), 1);
    assert_eq!(doc.get::<i32>("x"), Ok(1));
    assert_eq!(doc.get::<i32>("y"), Err(Error::MalformedDocument));
    assert!(doc.lookup("y").is_none());
    assert!(!doc.contains::<i32>("y"));
}

#[test]
fn validate_is_shallow() {
    let mut data = NESTED;
    // Inflate the nested document's length field
    data[7] = 0x30;

    let doc = Document::new(&data);
    assert!(doc.validate(Some(20)));
    assert_eq!(doc.iter().next(), Some(Err(Error::MalformedDocument)));
    assert_eq!(doc.get::<Null>("n"), Err(Error::MalformedDocument));
}

#[test]
fn terminator_corruption() {
    let mut data = INT32_X;
    let last = data.len() - 1;
    data[last] ^= 0xff;
    assert!(!Document::new(&data).validate(None));
    assert!(!Document::new(&data).validate(Some(12)));
}

#[test]
fn declared_size_checks() {
    let doc = Document::new(&INT32_X);
    assert!(!doc.validate(Some(13)));

    // Declares more than is available
    let data = INT32_X;
    let doc = Document::new(&data[..8]);
    assert!(!doc.validate(None));
    assert_eq!(doc.iter().next(), Some(Err(Error::MalformedDocument)));

    // Too short to hold a length field
    let doc = Document::new(&[0x05, 0x00]);
    assert!(!doc.validate(None));
    assert_eq!(doc.size(), 0);
    let mut iter = doc.iter();
    assert_eq!(iter.next(), Some(Err(Error::MalformedDocument)));
    assert_eq!(iter.next(), None);

    // Negative length
    assert!(!Document::new(&hex!("ffffffff 00")).validate(None));
}

#[test]
fn malformed_payloads() {
    // String whose terminator is not where its length says
    let data = hex!("0f000000 02 7300 03000000 686969 00");
    let doc = Document::new(&data);
    assert!(doc.validate(None));
    assert_eq!(doc.get::<&str>("s"), Err(Error::MalformedDocument));

    // Invalid UTF-8
    let data = hex!("0f000000 02 7300 03000000 ff6900 00");
    let doc = Document::new(&data);
    assert_eq!(doc.get::<&str>("s"), Err(Error::MalformedDocument));

    // Non-UTF-8 keys still have a size, but an empty key
    let data = hex!("10 ff00 01000000");
    let node = Node::new(&data);
    assert_eq!(node.size(), 7);
    assert_eq!(node.key(), "");
    assert_eq!(node.key_bytes(), &[0xff]);
}

#[test]
fn raw_bytes() {
    let doc = Document::new(&NESTED);
    assert_eq!(doc.as_bytes(), &NESTED);

    let node = doc.lookup("d").unwrap();
    assert_eq!(node.as_bytes(), &NESTED[4..16]);
    assert_eq!(node.as_bytes().len(), node.size());

    // A nested document's bytes are exactly its payload
    let inner = node.as_document().unwrap();
    assert_eq!(inner.as_bytes(), node.payload());
    assert_eq!(inner.as_bytes().len(), inner.size());

    assert!(Node::empty().as_bytes().is_empty());
}

#![no_std]
extern crate alloc;

pub mod decode;
pub mod encode;
pub mod error;
pub mod registry;
pub mod tag;

pub use error::Error;
pub use tag::Tag;

#[cfg(test)]
mod decode_tests;

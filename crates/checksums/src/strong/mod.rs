//! Strong (cryptographic) hash primitives.

mod md5;

pub use md5::Md5;

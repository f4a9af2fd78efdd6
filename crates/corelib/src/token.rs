//! MD5 ring token (wire-compatible with existing deployments).
//!
//! Both server-token placement and key placement use the same function: the
//! MD5 digest of the UTF-8 byte form of the input, read as an unsigned
//! big-endian 128-bit integer. This matches `int(md5_hex(utf8(s)), 16)`
//! bit-exactly, so a ring built here routes identically to one built by the
//! deployments already in the field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ring token carrying the full 128-bit MD5 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Md5Token(pub u128);

impl Md5Token {
    /// Creates a token from a byte slice using MD5 hashing.
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = md5::compute(data);
        Md5Token(u128::from_be_bytes(digest.0))
    }

    /// Creates a token from a string key.
    pub fn from_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }

    /// Token position of virtual node `index` of `server`.
    ///
    /// Virtual node names follow the `"{server}-{index}"` convention; index 0
    /// is the parent token that carries the server's backing store.
    pub fn for_virtual_node(server: &str, index: usize) -> Self {
        Self::from_key(&format!("{}-{}", server, index))
    }

    /// Clockwise distance to another token, wrapping around the ring.
    pub fn distance_to(&self, other: &Self) -> Self {
        if other.0 >= self.0 {
            Md5Token(other.0 - self.0)
        } else {
            Md5Token((u128::MAX - self.0) + other.0 + 1)
        }
    }
}

impl fmt::Display for Md5Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

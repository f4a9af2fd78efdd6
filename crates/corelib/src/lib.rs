//! Core library for the caching side of the coordination + caching kit.
//!
//! This crate provides the fundamental abstractions for consistent-hash
//! routed caching:
//! - MD5 ring tokens (wire-compatible placement)
//! - The LRU cache node
//! - Backing-store and provisioning seams
//! - The hash ring router

pub mod cache;
pub mod error;
pub mod ring;
pub mod store;
pub mod token;

pub use cache::{CacheNode, LruCache};
pub use error::{Error, Result};
pub use ring::{HashRing, ServerInfo};
pub use store::{CacheStore, LocalProvisioner, NodeProvisioner};
pub use token::Md5Token;

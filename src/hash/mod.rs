//! Content hashing for identity and deduplication.

pub mod hasher;

pub use hasher::{digest, Hasher, PageSelector};

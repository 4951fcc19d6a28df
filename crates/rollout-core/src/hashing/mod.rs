//! Módulo de hashing, canonicalización JSON y fingerprints.

pub mod canonical_json;
pub mod fingerprint;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use fingerprint::fingerprint;
pub use hash::{hash_str, hash_value, sha256};

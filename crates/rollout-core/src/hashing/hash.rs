//! Hash helpers – abstracción para poder cambiar de algoritmo sin tocar el resto del core.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::canonical_json::to_canonical_json;

pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String { format!("{:x}", Sha256::digest(input.as_bytes())) }

/// Hash hex de la forma canónica de un valor JSON.
pub fn hash_value(value: &Value) -> String { hash_str(&to_canonical_json(value)) }

//! Canonical serialization for deterministic hashing.
//!
//! Layout fingerprints and parameter hashes are computed over canonical JSON
//! and hashed with xxh64, so two runs over the same input produce the same
//! hex string.
//!
//! ## Determinism Guarantees
//!
//! - Struct fields serialize in declaration order
//! - Vectors serialize in index order
//! - Maps in hashed data are BTreeMaps
//! - Floats are quantized to integers before hashing

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor for layout coordinates (1/1000 of a pixel).
pub const COORDINATE_QUANTIZATION: f64 = 1_000.0;

/// Serialize a value to canonical JSON bytes.
///
/// Only fails for maps with non-string keys that cannot be stringified,
/// which no hashed type in this crate contains.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as a 16-digit hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Quantize a coordinate to an integer for hashing.
pub fn quantize(value: f64, factor: f64) -> i64 {
    (value * factor).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_determinism() {
        let mut positions = BTreeMap::new();
        positions.insert(2i64, (quantize(190.0, COORDINATE_QUANTIZATION), 0));
        positions.insert(1i64, (quantize(40.0, COORDINATE_QUANTIZATION), 0));

        assert_eq!(canonical_hash(&positions), canonical_hash(&positions.clone()));
        assert_eq!(canonical_hash_hex(&positions).len(), 16);
    }

    #[test]
    fn test_quantize_absorbs_float_noise() {
        let a = 0.1 + 0.2;
        let b = 0.3;
        assert_ne!(a, b);
        assert_eq!(quantize(a, COORDINATE_QUANTIZATION), quantize(b, COORDINATE_QUANTIZATION));
    }
}

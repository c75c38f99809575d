//! Deterministic hashing helpers.
//!
//! Two distinct needs, two distinct hashes:
//! - the Sanitizer's placeholder for tokens that sanitize to nothing needs a
//!   short, stable-across-runs digest (FNV-1a is enough and has no
//!   dependency);
//! - the Path Resolver's file-vs-file collision suffix is specified as "a
//!   cryptographic hash of the item identifier", so it uses SHA-256.

use sha2::{Digest, Sha256};

/// FNV-1a 64-bit, folded to 32 bits for a short hex placeholder.
pub fn fnv1a_placeholder(input: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let folded = (hash ^ (hash >> 32)) as u32;
    format!("_{folded:x}")
}

/// First 4 hex characters of the SHA-256 digest of `input`.
pub fn sha256_suffix(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(4);
    for byte in digest.iter().take(2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

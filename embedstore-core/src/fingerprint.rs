use ripemd::{Digest, Ripemd160};

/// Hex length of a RIPEMD-160 digest.
pub const FINGERPRINT_LEN: usize = 40;

/// Derive the blob store address of a content key
pub fn compute_fingerprint(key: &str) -> String {
    let mut hasher = Ripemd160::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

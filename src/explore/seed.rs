// src/explore/seed.rs
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Hash a string to a 64-bit value. SHA-256 truncated to the first eight
/// bytes, little-endian. Stable across processes, platforms and releases,
/// which is what makes logged decisions reproducible offline.
pub fn uniform_hash(s: &str) -> u64 {
    uniform_hash_bytes(s.as_bytes())
}

/// Byte-slice form of [`uniform_hash`]; also used for content addressing
/// in the dedup dictionary.
pub fn uniform_hash_bytes(data: &[u8]) -> u64 {
    let digest = Sha256::digest(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Per-request seed: hash(app_id) + hash(event_id), wrapping.
pub fn event_seed(seed_shift: u64, event_id: &str) -> u64 {
    seed_shift.wrapping_add(uniform_hash(event_id))
}

/// Mix a slot index into an event seed so each slot of a multi-slot request
/// draws independently while staying reproducible.
pub fn slot_seed(event_seed: u64, slot_index: usize) -> u64 {
    event_seed.wrapping_add(uniform_hash(&slot_index.to_string()))
}

/// One deterministic uniform draw in [0, 1) from a 64-bit seed. ChaCha20 is
/// seeded directly rather than going through the thread RNG, so the same
/// seed always yields the same draw.
pub fn uniform_draw(seed: u64) -> f32 {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.gen_range(0.0f32..1.0f32)
}

//! Small numeric and identity helpers

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// Integer square root (floor), digit-by-digit on the result bits.
///
/// Starts from bit 15, which covers squares of the full coordinate
/// range. Non-positive input yields 0.
pub fn isqrt(x: i64) -> i64 {
    if x <= 0 {
        return 0;
    }
    let mut root: i64 = 0;
    let mut bit: i64 = 1 << 15;
    while bit > 0 {
        let trial = root + bit;
        if trial * trial <= x {
            root = trial;
        }
        bit >>= 1;
    }
    root
}

/// Generate the 16-byte session fingerprint.
///
/// Sixteen random bytes drawn as four little-endian u32 chunks, with the
/// first four bytes XORed against the big-endian bytes of the wall-clock
/// seconds. Opaque and never validated; logged once at startup so a
/// session can be told apart in logs.
pub fn session_fingerprint<R: RngCore>(rng: &mut R) -> [u8; 16] {
    let mut id = [0u8; 16];
    for chunk in id.chunks_exact_mut(4) {
        chunk.copy_from_slice(&rng.next_u32().to_le_bytes());
    }
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0) as u32;
    for (byte, stamp) in id[..4].iter_mut().zip(secs.to_be_bytes()) {
        *byte ^= stamp;
    }
    id
}

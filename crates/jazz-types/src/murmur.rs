//! # MurmurHash64A
//!
//! SPEC §3.2: `hash64 == MurmurHash64A(tensor..end, total_bytes - sizeof(header))`.
//! This is a direct, allocation-free port of Austin Appleby's MurmurHash64A
//! (the 64-bit, x64-friendly variant with an explicit seed), matching the
//! original's `jazz_utils::MurmurHash64A` bit for bit.

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

/// Hash `data` with `seed`, bit-for-bit compatible with the original's
/// `MurmurHash64A`.
pub fn murmur_hash64a(data: &[u8], seed: u64) -> u64 {
    let len = data.len();
    let mut h: u64 = seed ^ (len as u64).wrapping_mul(M);

    let nblocks = len / 8;
    let mut chunks = data[..nblocks * 8].chunks_exact(8);
    for chunk in &mut chunks {
        let mut k = u64::from_le_bytes(chunk.try_into().expect("chunk is exactly 8 bytes"));
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = &data[nblocks * 8..];
    if !tail.is_empty() {
        let mut buf = [0u8; 8];
        buf[..tail.len()].copy_from_slice(tail);
        // MurmurHash64A folds the trailing bytes in from the top down,
        // most-significant tail byte last, matching the reference C
        // implementation's big-endian-shift tail handling on little-endian
        // hosts.
        let mut k: u64 = 0;
        for (i, &b) in tail.iter().enumerate().rev() {
            k ^= (b as u64) << (8 * i);
        }
        h ^= k;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_deterministic() {
        let a = murmur_hash64a(b"", 0);
        let b = murmur_hash64a(b"", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = murmur_hash64a(b"jazz", 0);
        let b = murmur_hash64a(b"jazz", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn is_sensitive_to_tail_bytes() {
        let a = murmur_hash64a(b"0123456789", 42);
        let b = murmur_hash64a(b"0123456780", 42);
        assert_ne!(a, b);
    }

    #[test]
    fn stable_across_calls_with_same_input() {
        let data: Vec<u8> = (0..97u8).collect();
        let a = murmur_hash64a(&data, 7);
        let b = murmur_hash64a(&data, 7);
        assert_eq!(a, b);
    }
}

//! Deterministic derivation of NTT-friendly prime chains.
//!
//! The parameter hint carries only bit sizes (`logQi`); the concrete
//! ciphertext moduli are derived here as the largest primes below `2^bits`
//! satisfying `q ≡ 1 (mod 2N)`, scanning downward. Both sides of the
//! protocol run this derivation, so a client holding the published metadata
//! reconstructs exactly the server's moduli.

use crate::error::{PirError, Result};
use crate::math::modular::ModQ;

/// Deterministic Miller-Rabin witnesses covering the full u64 range.
const MR_WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Miller-Rabin primality test, deterministic for 64-bit inputs.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &MR_WITNESSES {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    // n - 1 = d * 2^r with d odd
    let mut d = n - 1;
    let mut r = 0u32;
    while d & 1 == 0 {
        d >>= 1;
        r += 1;
    }

    'witness: for &a in &MR_WITNESSES {
        let mut x = ModQ::pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = ModQ::mul(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Largest prime `p < 2^bits` with `p ≡ 1 (mod step)`, skipping any value
/// in `taken`.
fn prime_below(bits: usize, step: u64, taken: &[u64]) -> Option<u64> {
    let ceiling = 1u64 << bits;
    // Largest candidate ≡ 1 (mod step) strictly below 2^bits.
    let mut candidate = ceiling - (ceiling - 1) % step;
    while candidate > step {
        if !taken.contains(&candidate) && is_prime(candidate) {
            return Some(candidate);
        }
        candidate -= step;
    }
    None
}

/// Derive the ciphertext modulus chain for ring degree `n` from the ordered
/// bit sizes in `bit_sizes`. Every modulus is NTT-friendly for the
/// negacyclic transform (`q ≡ 1 mod 2n`) and distinct within the chain.
pub fn derive_chain(bit_sizes: &[usize], n: usize) -> Result<Vec<u64>> {
    let step = 2 * n as u64;
    let mut chain = Vec::with_capacity(bit_sizes.len());
    for &bits in bit_sizes {
        if !(20..=60).contains(&bits) {
            return Err(PirError::InvalidParameters(format!(
                "modulus bit size {} outside supported range 20..=60",
                bits
            )));
        }
        let prime = prime_below(bits, step, &chain).ok_or_else(|| {
            PirError::InvalidParameters(format!(
                "no {}-bit NTT-friendly prime for ring degree {}",
                bits, n
            ))
        })?;
        chain.push(prime);
    }
    Ok(chain)
}

//! CRT recombination for RNS ring elements.
//!
//! Decryption leaves one residue per ciphertext modulus; this module
//! composes them into the centered representative modulo the full chain
//! and reduces it into the plaintext ring. With at most two ~54-bit
//! primes the composite fits comfortably in 128 bits, so no wide-integer
//! arithmetic is needed.

use crate::math::modular::ModQ;

/// Precomputed recombination context for a 1- or 2-prime chain.
pub struct CrtContext {
    moduli: Vec<u64>,
    /// q0^(-1) mod q1, present only for two-prime chains.
    q0_inv_mod_q1: Option<u64>,
    /// Full composite modulus Q.
    composite: u128,
}

impl CrtContext {
    /// Build a context for the given chain.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty or longer than two primes; parameter
    /// validation enforces the supported arity before this is reached.
    pub fn new(moduli: &[u64]) -> Self {
        assert!(
            (1..=2).contains(&moduli.len()),
            "supported modulus chains have one or two primes"
        );
        let composite = moduli.iter().fold(1u128, |acc, &q| acc * q as u128);
        let q0_inv_mod_q1 = match moduli {
            [q0, q1] => Some(ModQ::inv(q0 % q1, *q1)),
            _ => None,
        };
        Self {
            moduli: moduli.to_vec(),
            q0_inv_mod_q1,
            composite,
        }
    }

    /// Compose per-prime residues, center into `(-Q/2, Q/2]`, and reduce
    /// modulo `t` into `[0, t)`.
    pub fn lift_centered_mod(&self, residues: &[u64], t: u64) -> u64 {
        debug_assert_eq!(residues.len(), self.moduli.len());

        let value: u128 = match (self.moduli.as_slice(), self.q0_inv_mod_q1) {
            ([_], _) => residues[0] as u128,
            ([q0, q1], Some(inv)) => {
                // x = a0 + q0 * ((a1 - a0) * q0^(-1) mod q1)
                let a0 = residues[0];
                let a1 = residues[1];
                let a0_mod_q1 = a0 % q1;
                let diff = if a1 >= a0_mod_q1 {
                    a1 - a0_mod_q1
                } else {
                    a1 + q1 - a0_mod_q1
                };
                let steps = (diff as u128 * inv as u128) % *q1 as u128;
                a0 as u128 + *q0 as u128 * steps
            }
            _ => unreachable!(),
        };

        // Center, then reduce mod t without losing the sign.
        let half = self.composite / 2;
        if value > half {
            let negated = (self.composite - value) % t as u128;
            if negated == 0 {
                0
            } else {
                t - negated as u64
            }
        } else {
            (value % t as u128) as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_prime_centering() {
        let q = 1000003u64;
        let crt = CrtContext::new(&[q]);
        let t = 257u64;

        // Small positive values reduce directly.
        assert_eq!(crt.lift_centered_mod(&[5], t), 5);
        // q - 1 represents -1, which is t - 1 mod t.
        assert_eq!(crt.lift_centered_mod(&[q - 1], t), t - 1);
        // -t represents 0 mod t.
        assert_eq!(crt.lift_centered_mod(&[q - t], t), 0);
    }

    #[test]
    fn test_two_prime_compose() {
        let q0 = 1000003u64;
        let q1 = 1000033u64;
        let crt = CrtContext::new(&[q0, q1]);
        let t = 65537u64;

        for value in [0u128, 1, 42, 65536, 123456789] {
            let residues = [(value % q0 as u128) as u64, (value % q1 as u128) as u64];
            assert_eq!(crt.lift_centered_mod(&residues, t), (value % t as u128) as u64);
        }

        // A negative value: Q - 3 represents -3.
        let q = q0 as u128 * q1 as u128;
        let neg3 = q - 3;
        let residues = [(neg3 % q0 as u128) as u64, (neg3 % q1 as u128) as u64];
        assert_eq!(crt.lift_centered_mod(&residues, t), t - 3);
    }
}

//! The BGV scheme: SIMD batching, key generation, public-key encryption,
//! and the single ciphertext×plaintext product the PIR protocol needs.
//!
//! Plaintexts live in `Z_t[X]/(X^N + 1)` with `t ≡ 1 (mod 2N)`, which
//! splits the ring into `N` slots: a vector of `Z_t` values batch-encodes
//! into one polynomial, and ring multiplication acts slot-wise. Ciphertexts
//! are degree-1 RLWE pairs over the RNS ring `R_q` with `t`-scaled noise,
//! so decryption is a plain reduction mod `t` after CRT recombination;
//! no rescaling and no relinearization at depth 1.

pub mod ciphertext;
mod encoder;
mod eval;
mod keys;

pub use ciphertext::{Ciphertext, Plaintext, CIPHERTEXT_DEGREE};
pub use keys::{PublicKey, SecretKey};

use crate::error::Result;
use crate::math::{CrtContext, NttContext};
use crate::params::BgvParams;

/// Shared cryptographic context derived from a parameter set.
///
/// Owns the NTT tables for both rings and the CRT recombination constants.
/// Build once per parameter set; all operations borrow it immutably, so it
/// can back any number of concurrent queries.
pub struct BgvContext {
    params: BgvParams,
    /// NTT over the ciphertext ring (one lane per RNS modulus).
    ntt_q: NttContext,
    /// NTT over the plaintext batching ring (single lane, modulus t).
    ntt_t: NttContext,
    crt: CrtContext,
}

impl BgvContext {
    /// Derive the working context from validated parameters.
    pub fn new(params: &BgvParams) -> Result<Self> {
        let ntt_q = NttContext::with_moduli(params.n(), params.moduli());
        let ntt_t = NttContext::new(params.n(), params.t());
        let crt = CrtContext::new(params.moduli());
        Ok(Self {
            params: params.clone(),
            ntt_q,
            ntt_t,
            crt,
        })
    }

    /// The parameter set this context was built from.
    pub fn params(&self) -> &BgvParams {
        &self.params
    }

    pub(crate) fn ntt_q(&self) -> &NttContext {
        &self.ntt_q
    }

    pub(crate) fn ntt_t(&self) -> &NttContext {
        &self.ntt_t
    }

    pub(crate) fn crt(&self) -> &CrtContext {
        &self.crt
    }

    /// True if both ciphertext components have the right length and every
    /// limb is reduced below its lane modulus.
    pub(crate) fn limbs_reduced(&self, ct: &Ciphertext) -> bool {
        self.ntt_q.limbs_reduced(ct.c0()) && self.ntt_q.limbs_reduced(ct.c1())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GaussianSampler;
    use crate::params::ParamHint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn context() -> BgvContext {
        let params = BgvParams::build(&ParamHint {
            log_n: Some(13),
            ..Default::default()
        })
        .unwrap();
        BgvContext::new(&params).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let ctx = context();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 12);
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let n = ctx.params().max_slots();
        let t = ctx.params().t();
        let slots: Vec<u64> = (0..n as u64).map(|i| i * 31 % t).collect();

        let pt = ctx.encode(&slots, ctx.params().max_level()).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let decrypted = ctx.decrypt(&sk, &ct).unwrap();

        assert_eq!(ctx.decode(&decrypted), slots);
    }

    #[test]
    fn test_two_prime_chain_roundtrip() {
        let params = BgvParams::build(&ParamHint {
            log_n: Some(13),
            log_qi: Some(vec![54, 54]),
            ..Default::default()
        })
        .unwrap();
        let ctx = BgvContext::new(&params).unwrap();
        assert_eq!(params.max_level(), 1);

        let mut rng = ChaCha20Rng::seed_from_u64(51);
        let mut sampler = GaussianSampler::with_seed(params.sigma(), 52);
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let n = params.max_slots();
        let slots: Vec<u64> = (0..n as u64).map(|i| i % 256).collect();
        let ones = vec![1u64; n];

        let pt = ctx.encode(&slots, params.max_level()).unwrap();
        let pt_ones = ctx.encode(&ones, params.max_level()).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let product = ctx.mul_plain(&ct, &pt_ones).unwrap();

        let decrypted = ctx.decrypt(&sk, &product).unwrap();
        assert_eq!(ctx.decode(&decrypted), slots);
    }

    #[test]
    fn test_ct_pt_multiply_is_slotwise() {
        let ctx = context();
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 22);
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let n = ctx.params().max_slots();
        let t = ctx.params().t();
        let lhs: Vec<u64> = (0..n as u64).map(|i| (i * 17 + 1) % 256).collect();
        let rhs: Vec<u64> = (0..n as u64).map(|i| (i * 13 + 5) % 256).collect();

        let level = ctx.params().max_level();
        let pt_lhs = ctx.encode(&lhs, level).unwrap();
        let pt_rhs = ctx.encode(&rhs, level).unwrap();

        let ct = ctx.encrypt(&pk, &pt_lhs, &mut rng, &mut sampler);
        let product = ctx.mul_plain(&ct, &pt_rhs).unwrap();
        let decrypted = ctx.decrypt(&sk, &product).unwrap();

        let expected: Vec<u64> = lhs
            .iter()
            .zip(&rhs)
            .map(|(&a, &b)| a * b % t)
            .collect();
        assert_eq!(ctx.decode(&decrypted), expected);
    }
}

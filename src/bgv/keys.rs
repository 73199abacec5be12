//! Key generation, encryption, and decryption.
//!
//! BGV with `t`-scaled noise: the public key is `(a, t·e − a·s)` for a
//! ternary secret `s`, and a fresh encryption of a message polynomial `m`
//! is
//!
//! ```text
//! c1 = u·a + t·e1
//! c0 = u·b + t·e2 + lift(m)
//! ```
//!
//! so `c0 + c1·s = t·(u·e + e1·s + e2) + lift(m)` and reduction mod `t`
//! after centering strips the noise in one step.

use rand::Rng;

use crate::bgv::ciphertext::{Ciphertext, Plaintext};
use crate::bgv::BgvContext;
use crate::error::{PirError, Result};
use crate::math::{GaussianSampler, ModQ};

/// BGV secret key: a ternary ring element, kept in the evaluation domain.
///
/// Never leaves the client process.
#[derive(Clone)]
pub struct SecretKey {
    pub(crate) s: Vec<u64>,
}

/// BGV public key `(a, b = t·e − a·s)`, evaluation domain.
#[derive(Clone)]
pub struct PublicKey {
    pub(crate) a: Vec<u64>,
    pub(crate) b: Vec<u64>,
}

impl BgvContext {
    /// Generate a fresh key pair.
    pub fn generate_keys<R: Rng>(
        &self,
        rng: &mut R,
        sampler: &mut GaussianSampler,
    ) -> (SecretKey, PublicKey) {
        let mut s = self.sample_ternary(rng);
        self.ntt_q().forward(&mut s);

        let mut a = self.sample_uniform(rng);
        self.ntt_q().forward(&mut a);

        let mut e = self.sample_scaled_noise(sampler);
        self.ntt_q().forward(&mut e);

        // b = t·e − a·s
        let mut a_s = vec![0u64; self.ntt_q().element_len()];
        self.ntt_q().pointwise_mul(&a, &s, &mut a_s);
        let mut b = e;
        self.ntt_q().sub_inplace(&mut b, &a_s);

        (SecretKey { s }, PublicKey { a, b })
    }

    /// Encrypt a plaintext under a public key.
    pub fn encrypt<R: Rng>(
        &self,
        pk: &PublicKey,
        pt: &Plaintext,
        rng: &mut R,
        sampler: &mut GaussianSampler,
    ) -> Ciphertext {
        let len = self.ntt_q().element_len();

        let mut u = self.sample_ternary(rng);
        self.ntt_q().forward(&mut u);

        let mut e1 = self.sample_scaled_noise(sampler);
        self.ntt_q().forward(&mut e1);
        let mut e2 = self.sample_scaled_noise(sampler);
        self.ntt_q().forward(&mut e2);

        let mut c1 = vec![0u64; len];
        self.ntt_q().pointwise_mul(&u, &pk.a, &mut c1);
        self.ntt_q().add_inplace(&mut c1, &e1);

        let mut c0 = vec![0u64; len];
        self.ntt_q().pointwise_mul(&u, &pk.b, &mut c0);
        self.ntt_q().add_inplace(&mut c0, &e2);
        self.ntt_q().add_inplace(&mut c0, &pt.eval);

        Ciphertext {
            c0,
            c1,
            level: pt.level,
        }
    }

    /// Decrypt a ciphertext back to its plaintext polynomial.
    ///
    /// # Errors
    ///
    /// `InvalidCiphertext` if the component shape does not match this
    /// context's ring.
    pub fn decrypt(&self, sk: &SecretKey, ct: &Ciphertext) -> Result<Plaintext> {
        let len = self.ntt_q().element_len();
        if ct.c0.len() != len || ct.c1.len() != len {
            return Err(PirError::InvalidCiphertext(format!(
                "component length {} does not match ring element length {}",
                ct.c0.len().max(ct.c1.len()),
                len
            )));
        }

        // w = c0 + c1·s, then back to coefficient form.
        let mut w = vec![0u64; len];
        self.ntt_q().pointwise_mul(&ct.c1, &sk.s, &mut w);
        self.ntt_q().add_inplace(&mut w, &ct.c0);
        self.ntt_q().inverse(&mut w);

        let n = self.params().n();
        let t = self.params().t();
        let lanes = self.ntt_q().lane_count();
        let mut residues = vec![0u64; lanes];

        let mut coeffs = vec![0u64; n];
        for (j, coeff) in coeffs.iter_mut().enumerate() {
            for (lane, residue) in residues.iter_mut().enumerate() {
                *residue = w[lane * n + j];
            }
            *coeff = self.crt().lift_centered_mod(&residues, t);
        }

        Ok(self.plaintext_from_coeffs(coeffs, ct.level))
    }

    /// Ternary polynomial with coefficients in {-1, 0, 1}, coefficient form.
    fn sample_ternary<R: Rng>(&self, rng: &mut R) -> Vec<u64> {
        let n = self.params().n();
        let lanes = self.ntt_q().lane_count();
        let mut poly = vec![0u64; n * lanes];
        for j in 0..n {
            let v: i64 = rng.gen_range(-1..=1);
            for lane in 0..lanes {
                poly[lane * n + j] = ModQ::from_signed(v, self.ntt_q().modulus(lane));
            }
        }
        poly
    }

    /// Uniform ring element, coefficient form. One 64-bit draw per
    /// coefficient is reduced into each RNS lane so the lanes agree on a
    /// single underlying integer.
    fn sample_uniform<R: Rng>(&self, rng: &mut R) -> Vec<u64> {
        let n = self.params().n();
        let lanes = self.ntt_q().lane_count();
        let mut poly = vec![0u64; n * lanes];
        for j in 0..n {
            let v: u64 = rng.gen();
            for lane in 0..lanes {
                poly[lane * n + j] = v % self.ntt_q().modulus(lane);
            }
        }
        poly
    }

    /// Gaussian noise polynomial scaled by t, coefficient form.
    fn sample_scaled_noise(&self, sampler: &mut GaussianSampler) -> Vec<u64> {
        let n = self.params().n();
        let t = self.params().t() as i64;
        let lanes = self.ntt_q().lane_count();
        let mut poly = vec![0u64; n * lanes];
        for j in 0..n {
            let v = t * sampler.sample();
            for lane in 0..lanes {
                poly[lane * n + j] = ModQ::from_signed(v, self.ntt_q().modulus(lane));
            }
        }
        poly
    }
}

#[cfg(test)]
mod tests {
    use crate::bgv::BgvContext;
    use crate::math::GaussianSampler;
    use crate::params::{BgvParams, ParamHint};
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
    fn test_zero_vector_encrypts_to_zero() {
        let ctx = context();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 2);
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let pt = ctx.encode(&[], 0).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let decrypted = ctx.decrypt(&sk, &ct).unwrap();

        assert!(ctx.decode(&decrypted).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_fresh_encryptions_differ() {
        let ctx = context();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 4);
        let (_, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let pt = ctx.encode(&[1, 2, 3], 0).unwrap();
        let ct1 = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let ct2 = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_full_slot_range_roundtrips() {
        let ctx = context();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 6);
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let t = ctx.params().t();
        let n = ctx.params().max_slots();
        // Exercise the extremes of the plaintext space, not just bytes.
        let slots: Vec<u64> = (0..n as u64).map(|i| (t - 1 - i % t) % t).collect();

        let pt = ctx.encode(&slots, 0).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let decrypted = ctx.decrypt(&sk, &ct).unwrap();
        assert_eq!(ctx.decode(&decrypted), slots);
    }
}

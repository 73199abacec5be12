//! SIMD batch encoding between slot vectors and plaintext polynomials.

use crate::bgv::ciphertext::Plaintext;
use crate::bgv::BgvContext;
use crate::error::{PirError, Result};

impl BgvContext {
    /// Batch-encode a slot vector into a plaintext polynomial at `level`.
    ///
    /// Vectors shorter than `N` are implicitly zero-padded; the encoder
    /// interpolates the slot values into coefficients (inverse NTT mod `t`)
    /// and lifts the result into the ciphertext ring for evaluation.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if the vector is longer than `N`, any value is
    /// outside `[0, t)`, or `level` is outside the modulus chain.
    pub fn encode(&self, slots: &[u64], level: usize) -> Result<Plaintext> {
        let n = self.params().max_slots();
        let t = self.params().t();

        if slots.len() > n {
            return Err(PirError::InvalidArguments(format!(
                "slot vector length {} exceeds N={}",
                slots.len(),
                n
            )));
        }
        if level > self.params().max_level() {
            return Err(PirError::InvalidArguments(format!(
                "level {} exceeds max level {}",
                level,
                self.params().max_level()
            )));
        }
        if let Some(v) = slots.iter().find(|&&v| v >= t) {
            return Err(PirError::InvalidArguments(format!(
                "slot value {} outside plaintext space [0, {})",
                v, t
            )));
        }

        let mut coeffs = vec![0u64; n];
        coeffs[..slots.len()].copy_from_slice(slots);
        self.ntt_t().inverse_standard(&mut coeffs);

        let eval = self.lift_to_rq(&coeffs);
        Ok(Plaintext {
            coeffs,
            eval,
            level,
        })
    }

    /// Batch-decode a plaintext polynomial back into its slot vector.
    pub fn decode(&self, pt: &Plaintext) -> Vec<u64> {
        let mut slots = pt.coeffs.clone();
        self.ntt_t().forward_standard(&mut slots);
        slots
    }

    /// Rebuild a plaintext from its canonical mod-`t` coefficients,
    /// recomputing the ciphertext-ring lift. Used by the wire codec.
    pub(crate) fn plaintext_from_coeffs(&self, coeffs: Vec<u64>, level: usize) -> Plaintext {
        let eval = self.lift_to_rq(&coeffs);
        Plaintext {
            coeffs,
            eval,
            level,
        }
    }

    /// Centered lift of mod-`t` coefficients into the NTT evaluation domain
    /// of R_q: coefficients above t/2 map to negative representatives, which
    /// keeps the noise growth of the ct×pt product at half strength.
    pub(crate) fn lift_to_rq(&self, coeffs: &[u64]) -> Vec<u64> {
        let n = self.params().n();
        let t = self.params().t();
        let half_t = t / 2;
        let lanes = self.ntt_q().lane_count();

        let mut lifted = vec![0u64; n * lanes];
        for lane in 0..lanes {
            let q = self.ntt_q().modulus(lane);
            let base = lane * n;
            for (j, &c) in coeffs.iter().enumerate() {
                lifted[base + j] = if c <= half_t { c } else { q - (t - c) };
            }
        }
        self.ntt_q().forward(&mut lifted);
        lifted
    }
}

#[cfg(test)]
mod tests {
    use crate::bgv::BgvContext;
    use crate::error::PirError;
    use crate::params::{BgvParams, ParamHint};

    fn context() -> BgvContext {
        let params = BgvParams::build(&ParamHint {
            log_n: Some(13),
            ..Default::default()
        })
        .unwrap();
        BgvContext::new(&params).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let ctx = context();
        let n = ctx.params().max_slots();
        let t = ctx.params().t();

        let slots: Vec<u64> = (0..n as u64).map(|i| i * 7919 % t).collect();
        let pt = ctx.encode(&slots, 0).unwrap();
        assert_eq!(ctx.decode(&pt), slots);
    }

    #[test]
    fn test_encode_pads_short_vectors() {
        let ctx = context();
        let slots = vec![97u64, 98, 99];
        let pt = ctx.encode(&slots, 0).unwrap();

        let decoded = ctx.decode(&pt);
        assert_eq!(&decoded[..3], &[97, 98, 99]);
        assert!(decoded[3..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_encode_rejects_oversized_vector() {
        let ctx = context();
        let slots = vec![0u64; ctx.params().max_slots() + 1];
        assert!(matches!(
            ctx.encode(&slots, 0),
            Err(PirError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_encode_rejects_out_of_range_value() {
        let ctx = context();
        let slots = vec![ctx.params().t()];
        assert!(matches!(
            ctx.encode(&slots, 0),
            Err(PirError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_encode_rejects_bad_level() {
        let ctx = context();
        assert!(matches!(
            ctx.encode(&[1, 2, 3], 1),
            Err(PirError::InvalidArguments(_))
        ));
    }
}

//! Homomorphic evaluation: the ciphertext×plaintext SIMD product.

use crate::bgv::ciphertext::{Ciphertext, Plaintext};
use crate::bgv::BgvContext;
use crate::error::{PirError, Result};

impl BgvContext {
    /// Multiply a ciphertext by a plaintext, slot-wise.
    ///
    /// Both components are scaled by the plaintext's ring lift, so the
    /// result stays at degree 1 and at the same level; no relinearization
    /// or rescaling follows.
    ///
    /// # Errors
    ///
    /// `InvalidCiphertext` if the operands disagree on level or shape.
    pub fn mul_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        if ct.level != pt.level {
            return Err(PirError::InvalidCiphertext(format!(
                "ciphertext at level {} but plaintext at level {}",
                ct.level, pt.level
            )));
        }
        let len = self.ntt_q().element_len();
        if ct.c0.len() != len || ct.c1.len() != len || pt.eval.len() != len {
            return Err(PirError::InvalidCiphertext(format!(
                "operand shape does not match ring element length {}",
                len
            )));
        }

        let mut c0 = vec![0u64; len];
        let mut c1 = vec![0u64; len];
        self.ntt_q().pointwise_mul(&ct.c0, &pt.eval, &mut c0);
        self.ntt_q().pointwise_mul(&ct.c1, &pt.eval, &mut c1);

        Ok(Ciphertext {
            c0,
            c1,
            level: ct.level,
        })
    }
}

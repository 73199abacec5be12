//! Negacyclic Number-Theoretic Transform over R_q = Z_q[X]/(X^N + 1).
//!
//! Polynomials are kept as flat `u64` slices of length `N * crt_count`,
//! one lane of `N` residues per RNS modulus. The forward transform maps a
//! coefficient lane into the evaluation domain (values held in Montgomery
//! form); multiplication of ring elements is then a pointwise product of
//! lanes. Every modulus must satisfy `q ≡ 1 (mod 2N)` so that a primitive
//! 2N-th root of unity ψ (with ψ^N = -1) exists.
//!
//! The same context type serves two rings in this crate: the ciphertext
//! ring (one or two ~54-bit primes) and the plaintext batching ring
//! (single modulus `t`), which is how the slot encoder gets its SIMD
//! structure.

use crate::math::modular::ModQ;

/// Precomputed per-modulus constants and twiddle tables.
struct Lane {
    /// The modulus q.
    q: u64,
    /// -q^(-1) mod 2^64, for Montgomery reduction.
    q_inv_neg: u64,
    /// R^2 mod q with R = 2^64, for conversion into Montgomery form.
    r_squared: u64,
    /// Forward twiddles (powers of ψ), Montgomery form, butterfly order.
    fwd: Vec<u64>,
    /// Inverse twiddles (powers of ψ^(-1)), Montgomery form.
    inv: Vec<u64>,
    /// N^(-1) mod q in Montgomery form, for inverse scaling.
    n_inv: u64,
}

/// NTT context for a fixed ring degree and modulus set.
///
/// Build once per parameter set and share; all transforms and pointwise
/// operations borrow it immutably.
pub struct NttContext {
    n: usize,
    lanes: Vec<Lane>,
}

impl NttContext {
    /// Context for a single modulus.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` is not ≡ 1 (mod 2n);
    /// parameter validation rejects such inputs before a context is built.
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[q])
    }

    /// Context for an RNS modulus chain.
    pub fn with_moduli(n: usize, moduli: &[u64]) -> Self {
        assert!(n.is_power_of_two(), "ring degree must be a power of two");
        assert!(!moduli.is_empty(), "modulus chain must be non-empty");

        let lanes = moduli.iter().map(|&q| Lane::build(n, q)).collect();
        Self { n, lanes }
    }

    /// Ring degree N.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Number of RNS lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// The modulus of lane `idx`.
    pub fn modulus(&self, idx: usize) -> u64 {
        self.lanes[idx].q
    }

    /// Expected flat length of a ring element.
    pub fn element_len(&self) -> usize {
        self.n * self.lanes.len()
    }

    /// Forward transform in place: standard-form coefficients in, Montgomery
    /// evaluation-domain values out.
    pub fn forward(&self, poly: &mut [u64]) {
        self.check_len(poly);
        for (idx, lane) in self.lanes.iter().enumerate() {
            let chunk = &mut poly[idx * self.n..(idx + 1) * self.n];
            for v in chunk.iter_mut() {
                *v = lane.to_mont(*v);
            }
            lane.forward(chunk);
        }
    }

    /// Inverse transform in place: Montgomery evaluation-domain values in,
    /// standard-form coefficients out.
    pub fn inverse(&self, poly: &mut [u64]) {
        self.check_len(poly);
        for (idx, lane) in self.lanes.iter().enumerate() {
            let chunk = &mut poly[idx * self.n..(idx + 1) * self.n];
            lane.inverse(chunk);
            for v in chunk.iter_mut() {
                *v = lane.mul(*v, 1);
            }
        }
    }

    /// Forward transform with standard-form output: coefficients in,
    /// plain (non-Montgomery) evaluation values out. This is the slot
    /// decoding direction of the batching encoder.
    pub fn forward_standard(&self, poly: &mut [u64]) {
        self.forward(poly);
        for (idx, lane) in self.lanes.iter().enumerate() {
            for v in poly[idx * self.n..(idx + 1) * self.n].iter_mut() {
                *v = lane.mul(*v, 1);
            }
        }
    }

    /// Inverse transform with standard-form input: plain evaluation values
    /// in, coefficients out. This is the slot encoding direction.
    pub fn inverse_standard(&self, poly: &mut [u64]) {
        self.check_len(poly);
        for (idx, lane) in self.lanes.iter().enumerate() {
            for v in poly[idx * self.n..(idx + 1) * self.n].iter_mut() {
                *v = lane.to_mont(*v);
            }
        }
        self.inverse(poly);
    }

    /// Pointwise product of two evaluation-domain elements into `out`.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], out: &mut [u64]) {
        self.check_len(a);
        self.check_len(b);
        self.check_len(out);
        for (idx, lane) in self.lanes.iter().enumerate() {
            let base = idx * self.n;
            for i in base..base + self.n {
                out[i] = lane.mul(a[i], b[i]);
            }
        }
    }

    /// Elementwise `a += b` mod q, valid in either domain.
    pub fn add_inplace(&self, a: &mut [u64], b: &[u64]) {
        self.check_len(a);
        self.check_len(b);
        for (idx, lane) in self.lanes.iter().enumerate() {
            let q = lane.q;
            let base = idx * self.n;
            for i in base..base + self.n {
                let sum = a[i] + b[i];
                a[i] = if sum >= q { sum - q } else { sum };
            }
        }
    }

    /// Elementwise `a -= b` mod q, valid in either domain.
    pub fn sub_inplace(&self, a: &mut [u64], b: &[u64]) {
        self.check_len(a);
        self.check_len(b);
        for (idx, lane) in self.lanes.iter().enumerate() {
            let q = lane.q;
            let base = idx * self.n;
            for i in base..base + self.n {
                a[i] = if a[i] >= b[i] { a[i] - b[i] } else { q - b[i] + a[i] };
            }
        }
    }

    /// True if every limb of `poly` is reduced below its lane modulus.
    pub fn limbs_reduced(&self, poly: &[u64]) -> bool {
        if poly.len() != self.element_len() {
            return false;
        }
        self.lanes.iter().enumerate().all(|(idx, lane)| {
            poly[idx * self.n..(idx + 1) * self.n]
                .iter()
                .all(|&v| v < lane.q)
        })
    }

    fn check_len(&self, poly: &[u64]) {
        assert_eq!(
            poly.len(),
            self.element_len(),
            "ring element length must be N * lane_count"
        );
    }
}

impl Lane {
    fn build(n: usize, q: u64) -> Self {
        assert!(
            q % (2 * n as u64) == 1,
            "modulus must be ≡ 1 (mod 2N) for the negacyclic NTT"
        );

        let q_inv_neg = Self::q_inv_neg(q);
        let r_squared = Self::r_squared(q);

        let psi = Self::primitive_root(2 * n as u64, q);
        let psi_inv = ModQ::inv(psi, q);

        let mut lane = Self {
            q,
            q_inv_neg,
            r_squared,
            fwd: Vec::new(),
            inv: Vec::new(),
            n_inv: 0,
        };

        lane.fwd = lane.twiddles(n, psi);
        lane.inv = lane.twiddles(n, psi_inv);
        lane.n_inv = lane.to_mont(ModQ::inv(n as u64, q));
        lane
    }

    /// Cooley-Tukey decimation-in-time butterflies.
    fn forward(&self, coeffs: &mut [u64]) {
        let n = coeffs.len();
        let q = self.q;
        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.fwd[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = self.mul(coeffs[j + t], w);
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Gentleman-Sande decimation-in-frequency butterflies plus N^(-1) scale.
    fn inverse(&self, coeffs: &mut [u64]) {
        let n = coeffs.len();
        let q = self.q;
        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = self.inv[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.mul(diff, w);
                }
            }
            t <<= 1;
        }

        for c in coeffs.iter_mut() {
            *c = self.mul(*c, self.n_inv);
        }
    }

    /// Twiddle table in the index order the butterflies consume: entry
    /// `2^j + i` holds the factor for block `i` of the stage with `2^j`
    /// blocks, built incrementally from the power-of-two anchors.
    fn twiddles(&self, n: usize, psi: u64) -> Vec<u64> {
        let mut factors = vec![0u64; n];
        factors[1] = self.to_mont(1);

        for m in 1..n {
            if m.is_power_of_two() {
                let exp = (n / (2 * m)) as u64;
                factors[m] = self.to_mont(ModQ::pow(psi, exp, self.q));
            } else {
                let prev = m & (m - 1); // clear lowest set bit
                let step = m & m.wrapping_neg(); // lowest set bit
                factors[m] = self.mul(factors[prev], factors[step]);
            }
        }
        factors
    }

    #[inline]
    fn mul(&self, a: u64, b: u64) -> u64 {
        let ab = a as u128 * b as u128;
        let m = (ab as u64).wrapping_mul(self.q_inv_neg) as u128;
        let t = ((ab + m * self.q as u128) >> 64) as u64;
        if t >= self.q {
            t - self.q
        } else {
            t
        }
    }

    #[inline]
    fn to_mont(&self, a: u64) -> u64 {
        self.mul(a, self.r_squared)
    }

    /// -q^(-1) mod 2^64 via Newton iteration on the 2-adic inverse.
    fn q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn r_squared(q: u64) -> u64 {
        let r = (1u128 << 64) % q as u128;
        ((r * r) % q as u128) as u64
    }

    /// Smallest ψ = g^((q-1)/order) of exact multiplicative order `order`.
    fn primitive_root(order: u64, q: u64) -> u64 {
        let exp = (q - 1) / order;
        for g in 2..q {
            let candidate = ModQ::pow(g, exp, q);
            if ModQ::pow(candidate, order, q) == 1 && ModQ::pow(candidate, order / 2, q) != 1 {
                return candidate;
            }
        }
        unreachable!("no primitive root for a validated NTT modulus");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 65537;

    #[test]
    fn test_roundtrip_mod_t() {
        for n in [16usize, 256, 1024] {
            let ctx = NttContext::new(n, T);
            let original: Vec<u64> = (0..n as u64).map(|i| i * 31 % T).collect();
            let mut poly = original.clone();
            ctx.forward(&mut poly);
            ctx.inverse(&mut poly);
            assert_eq!(poly, original, "roundtrip failed for n={}", n);
        }
    }

    #[test]
    fn test_roundtrip_large_prime() {
        let n = 256;
        let q = crate::math::primes::derive_chain(&[54], n).unwrap()[0];
        let ctx = NttContext::new(n, q);

        let original: Vec<u64> = (0..n as u64).map(|i| i.wrapping_mul(0x9e3779b9) % q).collect();
        let mut poly = original.clone();
        ctx.forward(&mut poly);
        ctx.inverse(&mut poly);
        assert_eq!(poly, original);
    }

    #[test]
    fn test_zero_fixed_point() {
        let ctx = NttContext::new(64, T);
        let mut poly = vec![0u64; 64];
        ctx.forward(&mut poly);
        assert!(poly.iter().all(|&c| c == 0));
        ctx.inverse(&mut poly);
        assert!(poly.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_pointwise_is_negacyclic_product() {
        // x * x^(n-1) = x^n = -1 in Z_q[X]/(X^n + 1)
        let n = 64;
        let ctx = NttContext::new(n, T);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);
        let mut product = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut product);
        ctx.inverse(&mut product);

        assert_eq!(product[0], T - 1);
        assert!(product[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_two_lane_roundtrip() {
        let n = 128;
        let moduli = crate::math::primes::derive_chain(&[54, 54], n).unwrap();
        let ctx = NttContext::with_moduli(n, &moduli);

        let original: Vec<u64> = (0..ctx.element_len() as u64)
            .map(|i| i * 7919 % moduli[(i as usize) / n])
            .collect();
        let mut poly = original.clone();
        ctx.forward(&mut poly);
        ctx.inverse(&mut poly);
        assert_eq!(poly, original);
    }

    #[test]
    fn test_standard_transforms_roundtrip() {
        let n = 128;
        let ctx = NttContext::new(n, T);
        let original: Vec<u64> = (0..n as u64).map(|i| i * 523 % T).collect();

        let mut poly = original.clone();
        ctx.inverse_standard(&mut poly);
        ctx.forward_standard(&mut poly);
        assert_eq!(poly, original);
    }

    #[test]
    fn test_ring_product_is_slotwise_product() {
        // Interpreting vectors as evaluations (slots), the negacyclic ring
        // product of their interpolations multiplies the slots pointwise.
        let n = 64;
        let ctx = NttContext::new(n, T);

        let v1: Vec<u64> = (0..n as u64).map(|i| (i * 101 + 7) % T).collect();
        let v2: Vec<u64> = (0..n as u64).map(|i| (i * 211 + 3) % T).collect();

        let mut p1 = v1.clone();
        let mut p2 = v2.clone();
        ctx.inverse_standard(&mut p1);
        ctx.inverse_standard(&mut p2);

        ctx.forward(&mut p1);
        ctx.forward(&mut p2);
        let mut product = vec![0u64; n];
        ctx.pointwise_mul(&p1, &p2, &mut product);
        ctx.inverse(&mut product);

        ctx.forward_standard(&mut product);
        let expected: Vec<u64> = v1
            .iter()
            .zip(&v2)
            .map(|(&a, &b)| (a as u128 * b as u128 % T as u128) as u64)
            .collect();
        assert_eq!(product, expected);
    }

    #[test]
    fn test_add_sub_inverse_each_other() {
        let n = 32;
        let ctx = NttContext::new(n, T);
        let a: Vec<u64> = (0..n as u64).map(|i| i * 999 % T).collect();
        let b: Vec<u64> = (0..n as u64).map(|i| i * 777 % T).collect();

        let mut c = a.clone();
        ctx.add_inplace(&mut c, &b);
        ctx.sub_inplace(&mut c, &b);
        assert_eq!(c, a);
    }
}

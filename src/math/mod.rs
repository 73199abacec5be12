//! Mathematical primitives for the BGV PIR engine.
//!
//! - Modular arithmetic over Z_q
//! - Negacyclic NTT over R_q = Z_q[X]/(X^N + 1), multi-modulus (RNS)
//! - CRT recombination for decryption
//! - Deterministic NTT-friendly prime derivation
//! - Discrete Gaussian sampling for encryption noise

pub mod crt;
pub mod gaussian;
pub mod modular;
pub mod ntt;
pub mod primes;

pub use crt::CrtContext;
pub use gaussian::{GaussianSampler, DEFAULT_SIGMA};
pub use modular::ModQ;
pub use ntt::NttContext;

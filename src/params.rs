//! BGV parameter sets for the PIR protocol.
//!
//! Parameters are built from a [`ParamHint`] whose unset fields fall back
//! to the protocol defaults, and published to clients as [`Metadata`]. The
//! published hint carries everything needed to rebuild an identical
//! parameter set on the client side. Any divergence between the two sides
//! corrupts ciphertext decoding, so the full hint (not just the ring
//! degree) goes over the wire.
//!
//! # Example
//!
//! ```
//! use cti_pir::params::{BgvParams, ParamHint};
//!
//! let hint = ParamHint { log_n: Some(13), ..Default::default() };
//! let params = BgvParams::build(&hint).unwrap();
//! assert_eq!(params.max_slots(), 8192);
//! assert_eq!(params.max_level(), 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PirError, Result};
use crate::math::gaussian::DEFAULT_SIGMA;
use crate::math::primes;

/// Smallest supported ring degree exponent.
pub const MIN_LOG_N: usize = 13;
/// Largest supported ring degree exponent.
pub const MAX_LOG_N: usize = 15;

/// Default plaintext modulus: the Fermat prime F4, NTT-friendly for every
/// supported ring degree (65536 = 2^16 is divisible by 2N up to N = 2^15).
pub const DEFAULT_T: u64 = 65537;

const DEFAULT_LOG_QI: &[usize] = &[54];
const DEFAULT_LOG_PI: &[usize] = &[54];

/// Optional inputs for building a parameter set.
///
/// Unset fields fall back to defaults. `log_n` has no default: it is
/// either given explicitly or chosen via [`choose_log_n`] before building.
#[derive(Debug, Clone, Default)]
pub struct ParamHint {
    /// Ring degree exponent; mandatory unless auto-selected.
    pub log_n: Option<usize>,
    /// Ciphertext modulus bit sizes; defaults to `[54]`.
    pub log_qi: Option<Vec<usize>>,
    /// Key-switch modulus bit sizes; defaults to `[54]`. Unused at depth 1
    /// but carried for forward compatibility and published in metadata.
    pub log_pi: Option<Vec<usize>>,
    /// Plaintext modulus; defaults to 65537.
    pub t: Option<u64>,
}

/// Immutable BGV parameter bundle.
///
/// Fixes the ciphertext polynomial ring (degree `N = 2^logN`, RNS modulus
/// chain derived from `logQi`) and the plaintext space (`Z_t` batched into
/// `N` SIMD slots).
#[derive(Debug, Clone)]
pub struct BgvParams {
    log_n: usize,
    n: usize,
    log_qi: Vec<usize>,
    log_pi: Vec<usize>,
    moduli: Vec<u64>,
    t: u64,
    sigma: f64,
}

impl BgvParams {
    /// Build and validate a parameter set from a hint.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` if `log_n` is missing or outside the supported
    /// `{13, 14, 15}` profile, if `t` is not an NTT-friendly prime for the
    /// chosen ring degree, or if the modulus chain cannot be derived.
    pub fn build(hint: &ParamHint) -> Result<Self> {
        let log_n = hint.log_n.ok_or_else(|| {
            PirError::InvalidParameters("logN must be set or auto-selected".into())
        })?;
        if !(MIN_LOG_N..=MAX_LOG_N).contains(&log_n) {
            return Err(PirError::InvalidParameters(format!(
                "logN {} outside supported range {}..={}",
                log_n, MIN_LOG_N, MAX_LOG_N
            )));
        }
        let n = 1usize << log_n;

        let t = hint.t.unwrap_or(DEFAULT_T);
        if t < 256 {
            return Err(PirError::InvalidParameters(format!(
                "plaintext modulus {} cannot hold a byte per slot",
                t
            )));
        }
        if !primes::is_prime(t) || t % (2 * n as u64) != 1 {
            return Err(PirError::InvalidParameters(format!(
                "plaintext modulus {} is not an NTT-friendly prime for N={}",
                t, n
            )));
        }

        let log_qi = hint
            .log_qi
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_QI.to_vec());
        if log_qi.is_empty() || log_qi.len() > 2 {
            return Err(PirError::InvalidParameters(format!(
                "logQi must hold one or two entries, got {}",
                log_qi.len()
            )));
        }
        let log_pi = hint
            .log_pi
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_PI.to_vec());

        let moduli = primes::derive_chain(&log_qi, n)?;

        Ok(Self {
            log_n,
            n,
            log_qi,
            log_pi,
            moduli,
            t,
            sigma: DEFAULT_SIGMA,
        })
    }

    /// Rebuild the parameter set a server published.
    ///
    /// The derivation is deterministic, so the resulting moduli match the
    /// server's exactly.
    pub fn from_metadata(meta: &Metadata) -> Result<Self> {
        let params = Self::build(&ParamHint {
            log_n: Some(meta.log_n),
            log_qi: Some(meta.log_qi.clone()),
            log_pi: Some(meta.log_pi.clone()),
            t: Some(meta.t),
        })?;
        if params.n != meta.ring_degree {
            return Err(PirError::InvalidParameters(format!(
                "metadata N={} does not match logN={}",
                meta.ring_degree, meta.log_n
            )));
        }
        Ok(params)
    }

    /// Ring degree exponent.
    pub fn log_n(&self) -> usize {
        self.log_n
    }

    /// Ring degree N.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of SIMD slots (equals N).
    pub fn max_slots(&self) -> usize {
        self.n
    }

    /// Highest level in the modulus chain: `|logQi| - 1`.
    pub fn max_level(&self) -> usize {
        self.log_qi.len() - 1
    }

    /// Derived ciphertext moduli, one per `logQi` entry.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Plaintext modulus t.
    pub fn t(&self) -> u64 {
        self.t
    }

    /// Ciphertext modulus bit sizes.
    pub fn log_qi(&self) -> &[usize] {
        &self.log_qi
    }

    /// Key-switch modulus bit sizes (published, unused at depth 1).
    pub fn log_pi(&self) -> &[usize] {
        &self.log_pi
    }

    /// Noise standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

/// Smallest `logN ∈ {13, 14, 15}` whose ring holds `n_records` windows of
/// `slots_per_record` slots.
///
/// # Errors
///
/// `InvalidArguments` for non-positive inputs; `CapacityExceeded` when even
/// the largest supported ring is too small.
pub fn choose_log_n(n_records: usize, slots_per_record: usize) -> Result<usize> {
    if n_records == 0 || slots_per_record == 0 {
        return Err(PirError::InvalidArguments(format!(
            "choose_log_n needs positive inputs, got n={}, s={}",
            n_records, slots_per_record
        )));
    }
    let required = n_records * slots_per_record;
    for log_n in MIN_LOG_N..=MAX_LOG_N {
        if required <= (1usize << log_n) {
            return Ok(log_n);
        }
    }
    Err(PirError::CapacityExceeded(format!(
        "required slots {} exceed the largest supported ring N={}",
        required,
        1usize << MAX_LOG_N
    )))
}

/// Public description of a parameter set plus the packing layout, exchanged
/// once before the first query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Number of records in the packed database.
    #[serde(rename = "n")]
    pub n_records: usize,
    /// Slots per record window (multiple of 8).
    pub record_s: usize,
    /// Ring degree exponent.
    #[serde(rename = "logN")]
    pub log_n: usize,
    /// Ring degree N.
    #[serde(rename = "N")]
    pub ring_degree: usize,
    /// Plaintext modulus.
    pub t: u64,
    /// Ciphertext modulus bit sizes, in chain order.
    #[serde(rename = "logQi")]
    pub log_qi: Vec<usize>,
    /// Key-switch modulus bit sizes.
    #[serde(rename = "logPi")]
    pub log_pi: Vec<usize>,
}

/// Assemble the metadata a server publishes for a committed database.
pub fn publish_metadata(params: &BgvParams, n_records: usize, record_s: usize) -> Metadata {
    Metadata {
        n_records,
        record_s,
        log_n: params.log_n(),
        ring_degree: params.n(),
        t: params.t(),
        log_qi: params.log_qi().to_vec(),
        log_pi: params.log_pi().to_vec(),
    }
}

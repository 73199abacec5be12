//! The PIR protocol roles: packing the database, evaluating a query on the
//! server, and building/extracting queries on the client.
//!
//! The protocol is a single SIMD product. The server packs all records
//! into one plaintext polynomial `m_DB`, window `i` holding the bytes of
//! record `i`. The client encrypts a one-hot window selector; multiplying
//! it against `m_DB` zeroes every window but the selected one, so one
//! multiplication recovers the full record and the server never sees which
//! window was live.

pub mod client;
pub mod pack;

pub use client::{self_test_query, PirClient};
pub use pack::{pack, slots_per_record};

use crate::bgv::{BgvContext, Ciphertext, Plaintext};
use crate::error::{PirError, Result};

/// Evaluate a PIR query: one ciphertext×plaintext product, nothing else.
///
/// Side-effect free; reads only the packed database and the context. The
/// selector must sit at the same level the database was encoded at.
///
/// # Errors
///
/// `InvalidCiphertext` for a level or shape mismatch; `EvaluationFailed`
/// if the underlying product fails.
pub fn evaluate(ctx: &BgvContext, ct_query: &Ciphertext, m_db: &Plaintext) -> Result<Ciphertext> {
    if ct_query.level() != m_db.level() {
        return Err(PirError::InvalidCiphertext(format!(
            "selector at level {} but database encoded at level {}",
            ct_query.level(),
            m_db.level()
        )));
    }
    ctx.mul_plain(ct_query, m_db).map_err(|e| match e {
        PirError::InvalidCiphertext(msg) => PirError::InvalidCiphertext(msg),
        other => PirError::EvaluationFailed(other.to_string()),
    })
}

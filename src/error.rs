//! Error taxonomy for the PIR service.
//!
//! Every externally visible failure maps onto one of these variants, and the
//! variant name is the leading token of the rendered message. The HTTP layer
//! returns the rendered text verbatim in the `error` field of the response
//! envelope, so callers can dispatch on the prefix.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PirError>;

/// All failure modes surfaced by the PIR core.
#[derive(Debug, Error)]
pub enum PirError {
    /// Parameter hint outside the supported profile, or a plaintext modulus
    /// incompatible with the chosen ring degree.
    #[error("InvalidParameters: {0}")]
    InvalidParameters(String),

    /// The packed database does not fit the ring: `n * s > N`, or no
    /// supported ring degree can hold it.
    #[error("CapacityExceeded: {0}")]
    CapacityExceeded(String),

    /// Malformed caller input: non-positive sizes, arity mismatch, bad
    /// record key, out-of-range index.
    #[error("InvalidArguments: {0}")]
    InvalidArguments(String),

    /// A read method was called before a successful initialization.
    #[error("NotInitialized: ledger has not been initialized")]
    NotInitialized,

    /// Ciphertext (or plaintext) bytes failed deserialization, or the
    /// deserialized value has the wrong shape, level, or degree.
    #[error("InvalidCiphertext: {0}")]
    InvalidCiphertext(String),

    /// The homomorphic product or an internal codec step failed.
    #[error("EvaluationFailed: {0}")]
    EvaluationFailed(String),

    /// `public_get` for a key the store does not hold.
    #[error("NotFound: {0}")]
    NotFound(String),

    /// The persistence backend failed; wraps the lower-level error text.
    #[error("StorageFailure: {0}")]
    StorageFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_name_leads_message() {
        let err = PirError::CapacityExceeded("required=9000 > N=8192".into());
        assert!(err.to_string().starts_with("CapacityExceeded"));

        let err = PirError::NotInitialized;
        assert!(err.to_string().starts_with("NotInitialized"));
    }
}

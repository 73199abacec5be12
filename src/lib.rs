//! Private information retrieval over a ledger of threat-intelligence
//! records, built on BGV homomorphic encryption.
//!
//! A client retrieves record `i` from an `n`-record database while the
//! server learns nothing about `i`: the server packs every record into one
//! SIMD plaintext polynomial, the client sends an encrypted one-hot window
//! selector, and a single ciphertext×plaintext product returns exactly the
//! selected record under encryption.
//!
//! Key components:
//! - BGV engine with slot batching and a depth-1 parameter profile
//! - Window-packed database and selector protocol
//! - Deterministic wire codec with base64 framing
//! - Readers-writer server state machine over an opaque key-value store

pub mod bgv;
pub mod codec;
pub mod error;
pub mod ledger;
pub mod math;
pub mod params;
pub mod pir;
pub mod records;

pub use bgv::{BgvContext, Ciphertext, Plaintext, PublicKey, SecretKey};
pub use error::{PirError, Result};
pub use ledger::{record_key, KvStore, MemoryStore, PirLedger};
pub use params::{choose_log_n, publish_metadata, BgvParams, Metadata, ParamHint};
pub use pir::{evaluate, pack, self_test_query, slots_per_record, PirClient};

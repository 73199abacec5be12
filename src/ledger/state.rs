//! The server state machine.
//!
//! A [`PirLedger`] starts uninitialized, becomes initialized through
//! [`init`](PirLedger::init), and may be re-initialized any number of
//! times. One readers-writer lock guards the whole cryptographic context:
//! `init` holds it exclusively for its full duration, while the read
//! methods share it and run in parallel. The context is built completely
//! off to the side and swapped in as the last step, so a failed `init`
//! leaves the previously committed view untouched.

use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::bgv::{BgvContext, Plaintext};
use crate::codec;
use crate::error::{PirError, Result};
use crate::params::{self, BgvParams, Metadata, ParamHint};
use crate::pir;
use crate::records;

const KEY_M_DB: &str = "m_DB";
const KEY_N: &str = "n";
const KEY_RECORD_S: &str = "record_s";
const KEY_BGV_PARAMS: &str = "bgv_params";

/// Parameter hint persisted alongside the packed database.
#[derive(Serialize, Deserialize)]
struct StoredParams {
    #[serde(rename = "logN")]
    log_n: usize,
    #[serde(rename = "N")]
    ring_degree: usize,
    #[serde(rename = "logQi")]
    log_qi: Vec<usize>,
    #[serde(rename = "logPi")]
    log_pi: Vec<usize>,
    t: u64,
}

/// World-state key for record `index` in a database of `n_records`.
///
/// Three decimal digits for databases up to 999 records, six above that.
pub fn record_key(index: usize, n_records: usize) -> String {
    if n_records <= 999 {
        format!("record{:03}", index)
    } else {
        format!("record{:06}", index)
    }
}

/// The committed cryptographic context: parameters, the packed database,
/// and its layout. Immutable once published.
struct CryptoContext {
    bgv: BgvContext,
    m_db: Plaintext,
    n_records: usize,
    record_s: usize,
}

/// Stateful PIR server over an opaque key-value store.
pub struct PirLedger<S: super::KvStore> {
    store: S,
    state: RwLock<Option<CryptoContext>>,
}

impl<S: super::KvStore> PirLedger<S> {
    /// A ledger in the uninitialized state.
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: RwLock::new(None),
        }
    }

    /// Initialize (or re-initialize) the ledger: build parameters, generate
    /// and persist `n_records` synthetic records, pack them into `m_DB`,
    /// and commit the new context. Runs under the exclusive lock; any error
    /// leaves the prior committed view intact.
    pub fn init(&self, n_records: usize, max_json: usize, hint: &ParamHint) -> Result<Metadata> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();

        if n_records == 0 || max_json == 0 {
            return Err(PirError::InvalidArguments(
                "numRecords and maxJSON must be positive".into(),
            ));
        }

        // Resolve the ring degree before any records exist, from the widest
        // window the budget implies.
        let s_guess = (max_json + 7) / 8 * 8;
        let mut hint = hint.clone();
        if hint.log_n.is_none() {
            let chosen = params::choose_log_n(n_records, s_guess)?;
            info!(log_n = chosen, n_records, s_guess, "auto-selected ring degree");
            hint.log_n = Some(chosen);
        }
        let params = BgvParams::build(&hint)?;

        let records = records::generate(n_records, max_json)?;
        let record_s = pir::slots_per_record(&records);

        let required = n_records * record_s;
        if required > params.max_slots() {
            return Err(PirError::CapacityExceeded(format!(
                "required slots {} ({} records x {} slots) exceed N={}",
                required,
                n_records,
                record_s,
                params.max_slots()
            )));
        }

        let bgv = BgvContext::new(&params)?;
        let m_db = pir::pack(&bgv, &records, record_s)?;

        let m_db_bytes = codec::serialize_plaintext(&bgv, &m_db);
        let digest = hex::encode(Sha256::digest(&m_db_bytes));

        let filled: usize = records.iter().map(Vec::len).sum();
        info!(
            n_records,
            record_s,
            log_n = params.log_n(),
            filled_slots = filled,
            allocated_slots = required,
            empty_slots = params.max_slots() - required,
            m_db_sha256 = %digest,
            "packed database encoded"
        );

        let mut entries = Vec::with_capacity(n_records + 4);
        entries.push((KEY_M_DB.to_string(), m_db_bytes));
        entries.push((KEY_N.to_string(), n_records.to_string().into_bytes()));
        entries.push((KEY_RECORD_S.to_string(), record_s.to_string().into_bytes()));
        let stored = StoredParams {
            log_n: params.log_n(),
            ring_degree: params.n(),
            log_qi: params.log_qi().to_vec(),
            log_pi: params.log_pi().to_vec(),
            t: params.t(),
        };
        let stored_json = serde_json::to_vec(&stored)
            .map_err(|e| PirError::StorageFailure(e.to_string()))?;
        entries.push((KEY_BGV_PARAMS.to_string(), stored_json));
        for (i, rec) in records.iter().enumerate() {
            entries.push((record_key(i, n_records), rec.clone()));
        }
        self.store.put_many(&entries)?;

        let meta = params::publish_metadata(&params, n_records, record_s);
        *guard = Some(CryptoContext {
            bgv,
            m_db,
            n_records,
            record_s,
        });

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "ledger initialized");
        Ok(meta)
    }

    /// Rebuild the in-memory context from persisted state, e.g. after a
    /// process restart with a warm store.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the store holds no committed database;
    /// `StorageFailure` if the persisted values do not parse.
    pub fn resume(&self) -> Result<Metadata> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let n_records = self.read_decimal(KEY_N)?;
        let record_s = self.read_decimal(KEY_RECORD_S)?;

        let stored_bytes = self
            .store
            .get(KEY_BGV_PARAMS)?
            .ok_or(PirError::NotInitialized)?;
        let stored: StoredParams = serde_json::from_slice(&stored_bytes)
            .map_err(|e| PirError::StorageFailure(format!("corrupt bgv_params: {}", e)))?;
        let params = BgvParams::build(&ParamHint {
            log_n: Some(stored.log_n),
            log_qi: Some(stored.log_qi),
            log_pi: Some(stored.log_pi),
            t: Some(stored.t),
        })?;

        let bgv = BgvContext::new(&params)?;
        let m_db_bytes = self.store.get(KEY_M_DB)?.ok_or(PirError::NotInitialized)?;
        let m_db = codec::deserialize_plaintext(&bgv, &m_db_bytes)?;
        info!(n_records, record_s, log_n = params.log_n(), "resumed from persisted state");

        let meta = params::publish_metadata(&params, n_records, record_s);
        *guard = Some(CryptoContext {
            bgv,
            m_db,
            n_records,
            record_s,
        });
        Ok(meta)
    }

    /// Metadata of the committed database.
    pub fn get_metadata(&self) -> Result<Metadata> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let ctx = guard.as_ref().ok_or(PirError::NotInitialized)?;
        Ok(params::publish_metadata(
            ctx.bgv.params(),
            ctx.n_records,
            ctx.record_s,
        ))
    }

    /// Non-private read of one world-state key.
    pub fn public_get(&self, key: &str) -> Result<Vec<u8>> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            return Err(PirError::NotInitialized);
        }
        if key.is_empty() {
            return Err(PirError::InvalidArguments("key must not be empty".into()));
        }
        self.store
            .get(key)?
            .ok_or_else(|| PirError::NotFound(format!("key {}", key)))
    }

    /// The privacy-preserving read: evaluate an encrypted selector against
    /// the packed database and return the encrypted response.
    pub fn pir_query(&self, query_b64: &str) -> Result<String> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let ctx = guard.as_ref().ok_or(PirError::NotInitialized)?;

        let ct_query = codec::ciphertext_from_b64(&ctx.bgv, query_b64)?;

        let started = Instant::now();
        let ct_response = pir::evaluate(&ctx.bgv, &ct_query, &ctx.m_db)?;
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            log_n = ctx.bgv.params().log_n(),
            "homomorphic product evaluated"
        );

        Ok(codec::ciphertext_to_b64(&ctx.bgv, &ct_response))
    }

    fn read_decimal(&self, key: &str) -> Result<usize> {
        let bytes = self.store.get(key)?.ok_or(PirError::NotInitialized)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| PirError::StorageFailure(format!("corrupt {}: {}", key, e)))?;
        text.parse()
            .map_err(|e| PirError::StorageFailure(format!("corrupt {}: {}", key, e)))
    }
}

//! Client side of the protocol: selector construction and result
//! extraction.
//!
//! A client is built from the server's published metadata, derives the
//! same parameter set locally, and holds its own key pair. The secret key
//! never leaves this struct.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::bgv::{BgvContext, PublicKey, SecretKey};
use crate::codec;
use crate::error::{PirError, Result};
use crate::math::GaussianSampler;
use crate::params::{BgvParams, Metadata};

/// A PIR client session bound to one server initialization.
pub struct PirClient {
    ctx: BgvContext,
    sk: SecretKey,
    pk: PublicKey,
    n_records: usize,
    record_s: usize,
    rng: ChaCha20Rng,
    sampler: GaussianSampler,
}

impl PirClient {
    /// Build a client from server metadata with fresh randomness.
    pub fn from_metadata(meta: &Metadata) -> Result<Self> {
        Self::with_rng(meta, ChaCha20Rng::from_entropy())
    }

    /// Build a deterministic client from a fixed seed. Intended for tests
    /// and self-checks; a production client wants [`from_metadata`].
    ///
    /// [`from_metadata`]: Self::from_metadata
    pub fn from_metadata_seeded(meta: &Metadata, seed: u64) -> Result<Self> {
        Self::with_rng(meta, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(meta: &Metadata, mut rng: ChaCha20Rng) -> Result<Self> {
        if meta.n_records == 0 || meta.record_s == 0 {
            return Err(PirError::InvalidArguments(
                "metadata carries an empty database layout".into(),
            ));
        }
        if meta.n_records * meta.record_s > meta.ring_degree {
            return Err(PirError::CapacityExceeded(format!(
                "metadata layout {}x{} exceeds N={}",
                meta.n_records, meta.record_s, meta.ring_degree
            )));
        }

        let params = BgvParams::from_metadata(meta)?;
        let ctx = BgvContext::new(&params)?;
        let mut sampler = GaussianSampler::with_seed(params.sigma(), rng.next_u64());
        let (sk, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        Ok(Self {
            ctx,
            sk,
            pk,
            n_records: meta.n_records,
            record_s: meta.record_s,
            rng,
            sampler,
        })
    }

    /// Number of records the server advertised.
    pub fn n_records(&self) -> usize {
        self.n_records
    }

    /// Slot width of a record window.
    pub fn record_s(&self) -> usize {
        self.record_s
    }

    /// Build and encrypt the one-hot window selector for `index`, returning
    /// the base64 query string.
    ///
    /// The selector is 1 across slots `[index·s, (index+1)·s)` and 0
    /// elsewhere, so the homomorphic product keeps the whole record in one
    /// multiplication.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `index` is outside `[0, n)`.
    pub fn encrypt_query(&mut self, index: usize) -> Result<String> {
        if index >= self.n_records {
            return Err(PirError::InvalidArguments(format!(
                "record index {} out of range 0..{}",
                index, self.n_records
            )));
        }

        let params = self.ctx.params();
        let mut selector = vec![0u64; params.max_slots()];
        let start = index * self.record_s;
        selector[start..start + self.record_s].fill(1);

        let pt = self.ctx.encode(&selector, params.max_level())?;
        let ct = self
            .ctx
            .encrypt(&self.pk, &pt, &mut self.rng, &mut self.sampler);
        Ok(codec::ciphertext_to_b64(&self.ctx, &ct))
    }

    /// Decrypt a base64 response and extract the record bytes in window
    /// `index`.
    ///
    /// Reads the window left to right and stops at the first zero slot:
    /// trailing zero padding marks the end of a record shorter than its
    /// window. Slot values are guaranteed below 256 by the packing
    /// discipline, so the cast to bytes is lossless.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `index` is outside `[0, n)`;
    /// `InvalidCiphertext` if the response fails deserialization.
    pub fn decrypt_result(&self, response_b64: &str, index: usize) -> Result<Vec<u8>> {
        if index >= self.n_records {
            return Err(PirError::InvalidArguments(format!(
                "record index {} out of range 0..{}",
                index, self.n_records
            )));
        }

        let ct = codec::ciphertext_from_b64(&self.ctx, response_b64)?;
        let pt = self.ctx.decrypt(&self.sk, &ct)?;
        let slots = self.ctx.decode(&pt);

        let start = index * self.record_s;
        let window = &slots[start..start + self.record_s];
        let mut bytes = Vec::with_capacity(self.record_s);
        for &v in window {
            if v == 0 {
                break;
            }
            bytes.push(v as u8);
        }
        Ok(bytes)
    }
}

/// Deterministic selector for record 0 under a canonical seeded key pair.
///
/// Exists so the server's hot path can be exercised without a live client
/// (benches, smoke tests). The fixed seed makes the queried index public,
/// so this must never serve production traffic.
pub fn self_test_query(meta: &Metadata) -> Result<(PirClient, String)> {
    let mut client = PirClient::from_metadata_seeded(meta, 0)?;
    let query = client.encrypt_query(0)?;
    Ok((client, query))
}

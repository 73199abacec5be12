//! Deterministic wire codec for ciphertexts and plaintexts.
//!
//! The binary form is a fixed header followed by little-endian `u64`
//! limbs: plaintexts carry their canonical mod-`t` coefficients,
//! ciphertexts both evaluation-domain components. Serialization is a pure
//! function of value and parameters, and deserialization validates the
//! header against the local parameter set: a query built under different
//! parameters fails here with `InvalidCiphertext` instead of decoding to
//! garbage.
//!
//! Public strings wrap this binary form in standard-alphabet, padded
//! base64.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::bgv::{BgvContext, Ciphertext, Plaintext, CIPHERTEXT_DEGREE};
use crate::error::{PirError, Result};

const MAGIC: &[u8; 4] = b"BGVW";
const VERSION: u8 = 1;

const KIND_PLAINTEXT: u8 = 1;
const KIND_CIPHERTEXT: u8 = 2;

fn write_header(out: &mut Vec<u8>, ctx: &BgvContext, kind: u8, level: usize, degree: u8) {
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(kind);
    out.push(ctx.params().log_n() as u8);
    out.push(ctx.params().moduli().len() as u8);
    out.push(level as u8);
    out.push(degree);
}

fn read_header(cursor: &mut Cursor<&[u8]>, ctx: &BgvContext, kind: u8) -> Result<(usize, u8)> {
    let mut magic = [0u8; 4];
    std::io::Read::read_exact(cursor, &mut magic)
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if &magic != MAGIC {
        return Err(PirError::InvalidCiphertext("bad magic bytes".into()));
    }

    let version = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if version != VERSION {
        return Err(PirError::InvalidCiphertext(format!(
            "unsupported format version {}",
            version
        )));
    }

    let got_kind = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if got_kind != kind {
        return Err(PirError::InvalidCiphertext(format!(
            "expected kind {}, got {}",
            kind, got_kind
        )));
    }

    let log_n = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if log_n as usize != ctx.params().log_n() {
        return Err(PirError::InvalidCiphertext(format!(
            "ring degree mismatch: logN {} on the wire, {} locally",
            log_n,
            ctx.params().log_n()
        )));
    }

    let lanes = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if lanes as usize != ctx.params().moduli().len() {
        return Err(PirError::InvalidCiphertext(format!(
            "modulus chain mismatch: {} lanes on the wire, {} locally",
            lanes,
            ctx.params().moduli().len()
        )));
    }

    let level = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;
    if level as usize > ctx.params().max_level() {
        return Err(PirError::InvalidCiphertext(format!(
            "level {} exceeds max level {}",
            level,
            ctx.params().max_level()
        )));
    }

    let degree = cursor
        .read_u8()
        .map_err(|_| PirError::InvalidCiphertext("truncated header".into()))?;

    Ok((level as usize, degree))
}

fn read_limbs(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<u64>> {
    let mut limbs = vec![0u64; count];
    for limb in limbs.iter_mut() {
        *limb = cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| PirError::InvalidCiphertext("truncated payload".into()))?;
    }
    Ok(limbs)
}

/// Serialize a plaintext to its deterministic binary form.
pub fn serialize_plaintext(ctx: &BgvContext, pt: &Plaintext) -> Vec<u8> {
    let coeffs = pt.coeffs();
    let mut out = Vec::with_capacity(11 + coeffs.len() * 8);
    write_header(&mut out, ctx, KIND_PLAINTEXT, pt.level(), 0);
    for &c in coeffs {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

/// Deserialize a plaintext, rebuilding its ciphertext-ring lift.
pub fn deserialize_plaintext(ctx: &BgvContext, bytes: &[u8]) -> Result<Plaintext> {
    let mut cursor = Cursor::new(bytes);
    let (level, degree) = read_header(&mut cursor, ctx, KIND_PLAINTEXT)?;
    if degree != 0 {
        return Err(PirError::InvalidCiphertext(format!(
            "plaintext with nonzero degree {}",
            degree
        )));
    }

    let n = ctx.params().n();
    let coeffs = read_limbs(&mut cursor, n)?;
    if cursor.position() != bytes.len() as u64 {
        return Err(PirError::InvalidCiphertext("trailing bytes".into()));
    }
    let t = ctx.params().t();
    if coeffs.iter().any(|&c| c >= t) {
        return Err(PirError::InvalidCiphertext(
            "plaintext coefficient outside [0, t)".into(),
        ));
    }

    Ok(ctx.plaintext_from_coeffs(coeffs, level))
}

/// Serialize a ciphertext to its deterministic binary form.
pub fn serialize_ciphertext(ctx: &BgvContext, ct: &Ciphertext) -> Vec<u8> {
    let len = ctx.params().n() * ctx.params().moduli().len();
    let mut out = Vec::with_capacity(11 + 2 * len * 8);
    write_header(&mut out, ctx, KIND_CIPHERTEXT, ct.level(), CIPHERTEXT_DEGREE as u8);
    for component in [ct.c0(), ct.c1()] {
        for &limb in component {
            out.extend_from_slice(&limb.to_le_bytes());
        }
    }
    out
}

/// Deserialize and validate a ciphertext.
pub fn deserialize_ciphertext(ctx: &BgvContext, bytes: &[u8]) -> Result<Ciphertext> {
    let mut cursor = Cursor::new(bytes);
    let (level, degree) = read_header(&mut cursor, ctx, KIND_CIPHERTEXT)?;
    if degree as usize != CIPHERTEXT_DEGREE {
        return Err(PirError::InvalidCiphertext(format!(
            "ciphertext degree {} unsupported, expected {}",
            degree, CIPHERTEXT_DEGREE
        )));
    }

    let len = ctx.params().n() * ctx.params().moduli().len();
    let c0 = read_limbs(&mut cursor, len)?;
    let c1 = read_limbs(&mut cursor, len)?;
    if cursor.position() != bytes.len() as u64 {
        return Err(PirError::InvalidCiphertext("trailing bytes".into()));
    }

    let ct = Ciphertext::from_components(c0, c1, level);
    if !ctx.limbs_reduced(&ct) {
        return Err(PirError::InvalidCiphertext(
            "limb outside its modulus range".into(),
        ));
    }
    Ok(ct)
}

/// Base64-wrap a serialized ciphertext.
pub fn ciphertext_to_b64(ctx: &BgvContext, ct: &Ciphertext) -> String {
    B64.encode(serialize_ciphertext(ctx, ct))
}

/// Decode a base64 ciphertext string and deserialize it.
///
/// Malformed base64 is an `InvalidCiphertext`: the string is supposed to
/// be a ciphertext, and it failed before its header could even be read.
pub fn ciphertext_from_b64(ctx: &BgvContext, encoded: &str) -> Result<Ciphertext> {
    let bytes = B64
        .decode(encoded.as_bytes())
        .map_err(|e| PirError::InvalidCiphertext(format!("base64 decode failed: {}", e)))?;
    deserialize_ciphertext(ctx, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GaussianSampler;
    use crate::params::{BgvParams, ParamHint};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn context(log_n: usize) -> BgvContext {
        let params = BgvParams::build(&ParamHint {
            log_n: Some(log_n),
            ..Default::default()
        })
        .unwrap();
        BgvContext::new(&params).unwrap()
    }

    #[test]
    fn test_plaintext_roundtrip() {
        let ctx = context(13);
        let slots: Vec<u64> = (0..ctx.params().max_slots() as u64).map(|i| i % 256).collect();
        let pt = ctx.encode(&slots, 0).unwrap();

        let bytes = serialize_plaintext(&ctx, &pt);
        let restored = deserialize_plaintext(&ctx, &bytes).unwrap();
        assert_eq!(restored, pt);
        assert_eq!(ctx.decode(&restored), slots);
    }

    #[test]
    fn test_plaintext_serialization_is_deterministic() {
        let ctx = context(13);
        let pt = ctx.encode(&[1, 2, 3], 0).unwrap();
        assert_eq!(serialize_plaintext(&ctx, &pt), serialize_plaintext(&ctx, &pt));
    }

    #[test]
    fn test_ciphertext_roundtrip_bit_for_bit() {
        let ctx = context(13);
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 42);
        let (_, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let pt = ctx.encode(&[9, 8, 7], 0).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);

        let bytes = serialize_ciphertext(&ctx, &ct);
        let restored = deserialize_ciphertext(&ctx, &bytes).unwrap();
        assert_eq!(restored, ct);
        assert_eq!(serialize_ciphertext(&ctx, &restored), bytes);
    }

    #[test]
    fn test_b64_roundtrip() {
        let ctx = context(13);
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 44);
        let (_, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let pt = ctx.encode(&[1], 0).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);

        let encoded = ciphertext_to_b64(&ctx, &ct);
        let restored = ciphertext_from_b64(&ctx, &encoded).unwrap();
        assert_eq!(restored, ct);
    }

    #[test]
    fn test_bad_base64_is_invalid_ciphertext() {
        let ctx = context(13);
        let err = ciphertext_from_b64(&ctx, "!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, PirError::InvalidCiphertext(_)));
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let ctx = context(13);
        let mut rng = ChaCha20Rng::seed_from_u64(45);
        let mut sampler = GaussianSampler::with_seed(ctx.params().sigma(), 46);
        let (_, pk) = ctx.generate_keys(&mut rng, &mut sampler);

        let pt = ctx.encode(&[1], 0).unwrap();
        let ct = ctx.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let mut bytes = serialize_ciphertext(&ctx, &ct);
        bytes.truncate(bytes.len() / 2);

        assert!(matches!(
            deserialize_ciphertext(&ctx, &bytes),
            Err(PirError::InvalidCiphertext(_))
        ));
    }

    #[test]
    fn test_foreign_ring_degree_is_rejected() {
        // A ciphertext produced under logN=14 must not deserialize under 13.
        let ctx_14 = context(14);
        let mut rng = ChaCha20Rng::seed_from_u64(47);
        let mut sampler = GaussianSampler::with_seed(ctx_14.params().sigma(), 48);
        let (_, pk) = ctx_14.generate_keys(&mut rng, &mut sampler);
        let pt = ctx_14.encode(&[5], 0).unwrap();
        let ct = ctx_14.encrypt(&pk, &pt, &mut rng, &mut sampler);
        let bytes = serialize_ciphertext(&ctx_14, &ct);

        let ctx_13 = context(13);
        let err = deserialize_ciphertext(&ctx_13, &bytes).unwrap_err();
        assert!(matches!(err, PirError::InvalidCiphertext(_)));
    }
}

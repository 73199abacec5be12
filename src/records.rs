//! Synthetic CTI record generation.
//!
//! Records are JSON-encoded threat-intelligence entries with
//! deterministically derived fake hashes, padded up to the requested byte
//! budget. Four shapes cover the supported budgets, from a bare
//! hash-plus-severity pair up to a full entry with both digests. The
//! generator always stays within the budget, so the slot width computed
//! from the generated set equals `ceil(maxJSON / 8) · 8`.
//!
//! The PIR core treats records as opaque byte sequences; nothing below
//! this module knows or cares that they happen to be JSON.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{PirError, Result};

/// Supported record byte budgets.
pub const VALID_MAX_JSON: [usize; 6] = [64, 128, 224, 256, 384, 512];

const MALWARE_CLASSES: [&str; 5] = ["Trojan", "Worm", "Ransomware", "Backdoor", "Spyware"];
const MALWARE_FAMILIES: [&str; 5] = ["Emotet", "WannaCry", "Ryuk", "AgentTesla", "Pegasus"];
const THREAT_LEVELS: [&str; 4] = ["Low", "Medium", "High", "Critical"];

/// Byte cost of appending `,"padding":""` to a record object.
const PADDING_OVERHEAD: usize = 13;

#[derive(Serialize)]
struct ThinRecord<'a> {
    md5: String,
    threat_level: &'a str,
}

#[derive(Serialize)]
struct MiniRecord<'a> {
    md5: String,
    malware_family: &'a str,
    threat_level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    padding: Option<String>,
}

#[derive(Serialize)]
struct MidRecord<'a> {
    md5: String,
    sha256_short: String,
    malware_class: &'a str,
    malware_family: &'a str,
    av_detects: usize,
    threat_level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    padding: Option<String>,
}

#[derive(Serialize)]
struct RichRecord<'a> {
    md5: String,
    sha256: String,
    malware_class: &'a str,
    malware_family: &'a str,
    av_detects: usize,
    threat_level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    padding: Option<String>,
}

/// Generate `n` synthetic records of at most `max_json` bytes each.
///
/// Deterministic: the same `(n, max_json)` yields the same records.
///
/// # Errors
///
/// `InvalidArguments` for `n == 0` or a budget outside [`VALID_MAX_JSON`].
pub fn generate(n: usize, max_json: usize) -> Result<Vec<Vec<u8>>> {
    if n == 0 {
        return Err(PirError::InvalidArguments(
            "record count must be positive".into(),
        ));
    }
    if !VALID_MAX_JSON.contains(&max_json) {
        return Err(PirError::InvalidArguments(format!(
            "maxJSON {} not in allowed set {:?}",
            max_json, VALID_MAX_JSON
        )));
    }

    let mut records = Vec::with_capacity(n);
    for i in 0..n {
        let rec = match max_json {
            64 => thin_record(i, max_json),
            128 => mini_record(i, max_json),
            224 | 256 => mid_record(i, max_json),
            _ => rich_record(i, max_json),
        }?;
        debug_assert!(rec.len() <= max_json);
        records.push(rec);
    }
    Ok(records)
}

/// SHA-256-derived hex string of exactly `length` characters, stretched by
/// re-hashing when one digest is not enough.
fn fake_hash(prefix: &str, i: usize, length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut base = format!("{}{}", prefix, i);
    let mut hex_str = hex::encode(Sha256::digest(base.as_bytes()));
    while hex_str.len() < length {
        base.push('x');
        hex_str.push_str(&hex::encode(Sha256::digest(base.as_bytes())));
    }
    hex_str.truncate(length);
    hex_str
}

fn thin_record(i: usize, max_json: usize) -> Result<Vec<u8>> {
    let threat_level = THREAT_LEVELS[i % THREAT_LEVELS.len()];
    let base = serde_json::to_vec(&ThinRecord {
        md5: String::new(),
        threat_level,
    })
    .map_err(|e| PirError::InvalidArguments(e.to_string()))?;

    // The digest is the flex field; shrink it into whatever the budget
    // leaves after the fixed fields.
    let budget = max_json.saturating_sub(base.len());
    if budget < 8 {
        return Err(PirError::InvalidArguments(format!(
            "maxJSON {} too small for a thin record",
            max_json
        )));
    }
    let md5 = fake_hash("md5", i, budget.min(32));
    serde_json::to_vec(&ThinRecord { md5, threat_level })
        .map_err(|e| PirError::InvalidArguments(e.to_string()))
}

fn mini_record(i: usize, max_json: usize) -> Result<Vec<u8>> {
    let malware_family = MALWARE_FAMILIES[i % MALWARE_FAMILIES.len()];
    let threat_level = THREAT_LEVELS[i % THREAT_LEVELS.len()];
    let mut rec = MiniRecord {
        md5: fake_hash("md5", i, 32),
        malware_family,
        threat_level,
        padding: None,
    };
    rec.padding = padding_for(&rec, i, max_json)?;
    serde_json::to_vec(&rec).map_err(|e| PirError::InvalidArguments(e.to_string()))
}

fn mid_record(i: usize, max_json: usize) -> Result<Vec<u8>> {
    let mut rec = MidRecord {
        md5: fake_hash("md5", i, 32),
        sha256_short: fake_hash("sha_short", i, 16),
        malware_class: MALWARE_CLASSES[i % MALWARE_CLASSES.len()],
        malware_family: MALWARE_FAMILIES[i % MALWARE_FAMILIES.len()],
        av_detects: (i % 50) + 1,
        threat_level: THREAT_LEVELS[i % THREAT_LEVELS.len()],
        padding: None,
    };
    rec.padding = padding_for(&rec, i, max_json)?;
    serde_json::to_vec(&rec).map_err(|e| PirError::InvalidArguments(e.to_string()))
}

fn rich_record(i: usize, max_json: usize) -> Result<Vec<u8>> {
    let mut rec = RichRecord {
        md5: fake_hash("md5", i, 32),
        sha256: fake_hash("sha", i, 64),
        malware_class: MALWARE_CLASSES[i % MALWARE_CLASSES.len()],
        malware_family: MALWARE_FAMILIES[i % MALWARE_FAMILIES.len()],
        av_detects: (i % 50) + 1,
        threat_level: THREAT_LEVELS[i % THREAT_LEVELS.len()],
        padding: None,
    };
    rec.padding = padding_for(&rec, i, max_json)?;
    serde_json::to_vec(&rec).map_err(|e| PirError::InvalidArguments(e.to_string()))
}

/// Padding that brings a record to exactly `max_json` bytes, or `None`
/// when the fixed fields already fill the budget.
fn padding_for<T: Serialize>(fixed: &T, i: usize, max_json: usize) -> Result<Option<String>> {
    let fixed_len = serde_json::to_vec(fixed)
        .map_err(|e| PirError::InvalidArguments(e.to_string()))?
        .len();
    if fixed_len > max_json {
        return Err(PirError::InvalidArguments(format!(
            "maxJSON {} too small for this record shape ({} fixed bytes)",
            max_json, fixed_len
        )));
    }
    let remaining = max_json.saturating_sub(fixed_len + PADDING_OVERHEAD);
    if remaining == 0 {
        return Ok(None);
    }
    Ok(Some(fake_hash("pad", i, remaining)))
}

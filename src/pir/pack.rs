//! Packing records into the database plaintext.

use crate::bgv::{BgvContext, Plaintext};
use crate::error::{PirError, Result};

/// Slot width of a record window: the longest record's byte length rounded
/// up to a multiple of 8, and at least 8.
pub fn slots_per_record(records: &[Vec<u8>]) -> usize {
    let max_len = records.iter().map(Vec::len).max().unwrap_or(0);
    let s = (max_len + 7) / 8 * 8;
    s.max(8)
}

/// Pack `records` into a single plaintext polynomial with `s`-slot windows.
///
/// Byte `j` of record `i` lands in slot `i·s + j`; shorter records leave
/// trailing zero slots, which double as the end-of-record sentinel during
/// extraction. The plaintext is encoded at the top of the modulus chain.
///
/// # Errors
///
/// `CapacityExceeded` if `records.len() · s > N`; `InvalidArguments` if
/// `s` is not a positive multiple of 8 or a record is longer than its
/// window (over-length records are a generator bug, not something to
/// truncate silently).
pub fn pack(ctx: &BgvContext, records: &[Vec<u8>], s: usize) -> Result<Plaintext> {
    if s == 0 || s % 8 != 0 {
        return Err(PirError::InvalidArguments(format!(
            "slot width {} is not a positive multiple of 8",
            s
        )));
    }

    let n_slots = ctx.params().max_slots();
    let required = records.len() * s;
    if required > n_slots {
        return Err(PirError::CapacityExceeded(format!(
            "required slots {} ({} records x {} slots) exceed N={}",
            required,
            records.len(),
            s,
            n_slots
        )));
    }

    let mut packed = vec![0u64; n_slots];
    for (i, record) in records.iter().enumerate() {
        if record.len() > s {
            return Err(PirError::InvalidArguments(format!(
                "record {} is {} bytes, wider than its {}-slot window",
                i,
                record.len(),
                s
            )));
        }
        let start = i * s;
        for (j, &byte) in record.iter().enumerate() {
            packed[start + j] = byte as u64;
        }
    }

    ctx.encode(&packed, ctx.params().max_level())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgv::BgvContext;
    use crate::params::{BgvParams, ParamHint};

    fn context() -> BgvContext {
        let params = BgvParams::build(&ParamHint {
            log_n: Some(13),
            ..Default::default()
        })
        .unwrap();
        BgvContext::new(&params).unwrap()
    }

    #[test]
    fn test_slots_per_record_rounds_to_multiple_of_eight() {
        assert_eq!(slots_per_record(&[b"abc".to_vec(), b"fghij".to_vec()]), 8);
        assert_eq!(slots_per_record(&[vec![0u8; 8]]), 8);
        assert_eq!(slots_per_record(&[vec![0u8; 9]]), 16);
        assert_eq!(slots_per_record(&[vec![0u8; 100]]), 104);
    }

    #[test]
    fn test_slots_per_record_floor_is_eight() {
        assert_eq!(slots_per_record(&[]), 8);
        assert_eq!(slots_per_record(&[Vec::new()]), 8);
    }

    #[test]
    fn test_pack_window_layout() {
        let ctx = context();
        let records = vec![b"abc".to_vec(), b"de".to_vec(), b"fghij".to_vec()];
        let pt = pack(&ctx, &records, 8).unwrap();

        let slots = ctx.decode(&pt);
        assert_eq!(&slots[0..3], &[97, 98, 99]);
        assert!(slots[3..8].iter().all(|&v| v == 0));
        assert_eq!(&slots[8..10], &[100, 101]);
        assert!(slots[10..16].iter().all(|&v| v == 0));
        assert_eq!(&slots[16..21], &[102, 103, 104, 105, 106]);
        // Everything past the last window stays zero.
        assert!(slots[24..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_pack_at_exact_capacity() {
        let ctx = context();
        let records = vec![vec![0xABu8; 64]; 128]; // 128 * 64 = 8192 = N
        assert!(pack(&ctx, &records, 64).is_ok());
    }

    #[test]
    fn test_pack_rejects_over_capacity() {
        let ctx = context();
        let records = vec![vec![0u8; 64]; 129];
        assert!(matches!(
            pack(&ctx, &records, 64),
            Err(PirError::CapacityExceeded(_))
        ));
    }

    #[test]
    fn test_pack_rejects_over_length_record() {
        let ctx = context();
        let records = vec![vec![0u8; 9]];
        assert!(matches!(
            pack(&ctx, &records, 8),
            Err(PirError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_pack_rejects_unaligned_width() {
        let ctx = context();
        assert!(matches!(
            pack(&ctx, &[], 12),
            Err(PirError::InvalidArguments(_))
        ));
    }
}

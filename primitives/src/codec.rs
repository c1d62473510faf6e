//! Wire codecs for data that crosses the boundary in bulk.
//!
//! Two formats live here:
//!
//! - **Put-many batch.** A `lengths` array (i32 per record) plus one
//!   contiguous buffer. Record `i` occupies the next `lengths[i]` bytes and is
//!   a binary CID immediately followed by the block payload.
//! - **Reservation plan.** `[count: u32 LE]` then `count` entries of
//!   `[actor: u64 LE][amount: u128 LE]`.
//!
//! Decoders never read past the supplied buffers; every length is checked
//! against the bytes remaining before it is used.

use std::collections::BTreeSet;
use std::io::Cursor;

use cid::Cid;

use crate::types::{ActorId, TokenAmount};

/// Errors produced while decoding boundary buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of data: need {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("negative record length {0}")]
    NegativeLength(i32),

    #[error("record length {len} exceeds limit {max}")]
    RecordTooLarge { len: usize, max: usize },

    #[error("batch of {count} records exceeds limit {max}")]
    TooManyRecords { count: usize, max: usize },

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("{0} trailing bytes after last record")]
    TrailingBytes(usize),

    #[error("actor {0} appears more than once in plan")]
    DuplicateActor(ActorId),

    #[error("invalid varint")]
    InvalidVarint,
}

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_u128(&mut self) -> Result<u128, CodecError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.read_bytes(16)?);
        Ok(u128::from_le_bytes(buf))
    }
}

// ── Varints ──

/// Append `v` as an unsigned LEB128 varint.
pub fn write_uvarint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Read an unsigned LEB128 varint. Returns the value and bytes consumed.
pub fn read_uvarint(data: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate().take(10) {
        let bits = u64::from(byte & 0x7f);
        if i == 9 && byte > 0x01 {
            return Err(CodecError::InvalidVarint);
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::InvalidVarint)
}

// ── Put-many batch ──

/// One decoded put-many record. The payload is an owned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub cid: Cid,
    pub data: Vec<u8>,
}

/// Limits applied while decoding a put-many batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Absolute ceiling on a single record's declared length.
    pub max_record_len: usize,
    /// Ceiling on the number of records in one batch.
    pub max_records: usize,
}

/// Decode a put-many batch.
///
/// Records are decoded strictly in order. Any failure rejects the whole
/// batch; nothing is returned for the records that did decode.
pub fn decode_put_many(
    lengths: &[i32],
    buf: &[u8],
    limits: BatchLimits,
) -> Result<Vec<BlockRecord>, CodecError> {
    if lengths.len() > limits.max_records {
        return Err(CodecError::TooManyRecords {
            count: lengths.len(),
            max: limits.max_records,
        });
    }

    let mut reader = Reader::new(buf);
    let mut records = Vec::with_capacity(lengths.len());
    for &declared in lengths {
        if declared < 0 {
            return Err(CodecError::NegativeLength(declared));
        }
        let len = declared as usize;
        if len > limits.max_record_len {
            return Err(CodecError::RecordTooLarge {
                len,
                max: limits.max_record_len,
            });
        }
        let record = reader.read_bytes(len)?;
        records.push(decode_record(record)?);
    }

    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(records)
}

/// Decode a standalone binary CID, rejecting trailing bytes.
pub fn decode_cid(bytes: &[u8]) -> Result<Cid, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let cid = Cid::read_bytes(&mut cursor).map_err(|e| CodecError::InvalidCid(e.to_string()))?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - consumed));
    }
    Ok(cid)
}

fn decode_record(record: &[u8]) -> Result<BlockRecord, CodecError> {
    let mut cursor = Cursor::new(record);
    let cid = Cid::read_bytes(&mut cursor).map_err(|e| CodecError::InvalidCid(e.to_string()))?;
    let cid_len = cursor.position() as usize;
    Ok(BlockRecord {
        cid,
        data: record[cid_len..].to_vec(),
    })
}

/// Encode `(cid, payload)` pairs into the put-many wire form.
pub fn encode_put_many<D: AsRef<[u8]>>(
    blocks: &[(Cid, D)],
) -> Result<(Vec<i32>, Vec<u8>), CodecError> {
    let mut lengths = Vec::with_capacity(blocks.len());
    let mut buf = Vec::new();
    for (cid, data) in blocks {
        let start = buf.len();
        buf.extend_from_slice(&cid.to_bytes());
        buf.extend_from_slice(data.as_ref());
        let size = buf.len() - start;
        let size = i32::try_from(size).map_err(|_| CodecError::RecordTooLarge {
            len: size,
            max: i32::MAX as usize,
        })?;
        lengths.push(size);
    }
    Ok((lengths, buf))
}

// ── Reservation plan ──

const PLAN_ENTRY_LEN: usize = 8 + 16;

/// One actor's reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub actor: ActorId,
    pub amount: TokenAmount,
}

/// A reservation plan: at most one entry per actor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReservationPlan {
    pub entries: Vec<PlanEntry>,
}

impl ReservationPlan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all reserved amounts, or `None` on overflow.
    pub fn total(&self) -> Option<TokenAmount> {
        self.entries
            .iter()
            .try_fold(0u128, |acc, e| acc.checked_add(e.amount))
    }
}

/// Encode a plan.
pub fn encode_plan(plan: &ReservationPlan) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + plan.entries.len() * PLAN_ENTRY_LEN);
    buf.extend_from_slice(&(plan.entries.len() as u32).to_le_bytes());
    for entry in &plan.entries {
        buf.extend_from_slice(&entry.actor.to_le_bytes());
        buf.extend_from_slice(&entry.amount.to_le_bytes());
    }
    buf
}

/// Decode a plan, rejecting truncation, trailing bytes, and duplicate actors.
pub fn decode_plan(data: &[u8]) -> Result<ReservationPlan, CodecError> {
    let mut reader = Reader::new(data);
    let count = reader.read_u32()? as usize;

    // Check the declared count against the buffer before allocating for it.
    let needed = count.saturating_mul(PLAN_ENTRY_LEN);
    if needed > reader.remaining() {
        return Err(CodecError::Truncated {
            needed,
            remaining: reader.remaining(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let actor = reader.read_u64()?;
        let amount = reader.read_u128()?;
        if !seen.insert(actor) {
            return Err(CodecError::DuplicateActor(actor));
        }
        entries.push(PlanEntry { actor, amount });
    }

    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(ReservationPlan { entries })
}

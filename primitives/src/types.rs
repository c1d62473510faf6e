//! Core type aliases and constants for the externs bridge.

use cid::multihash::Multihash;
use cid::Cid;

use crate::codec::CodecError;

/// Chain epoch (block height). Negative values are never issued by the chain.
pub type ChainEpoch = i64;

/// Numeric actor identity, as resolved from an ID address.
pub type ActorId = u64;

/// Token amount in the smallest unit (atto).
pub type TokenAmount = u128;

/// 32 bytes of chain or beacon randomness.
pub type Randomness = [u8; 32];

/// Maximum encoded length of a content identifier.
pub const MAX_CID_LEN: usize = 100;

/// Multicodec code for raw binary blocks.
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec code for DAG-CBOR blocks.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// Multihash code for BLAKE3-256.
pub const BLAKE3_MULTIHASH: u64 = 0x1e;

/// Compute the v1 CID of `data` under `codec`, hashed with BLAKE3.
pub fn block_cid(codec: u64, data: &[u8]) -> Result<Cid, CodecError> {
    let digest = blake3::hash(data);
    let mh = Multihash::<64>::wrap(BLAKE3_MULTIHASH, digest.as_bytes())
        .map_err(|e| CodecError::InvalidCid(e.to_string()))?;
    Ok(Cid::new_v1(codec, mh))
}

//! `extbridge-primitives`: foundational types for the host externs bridge.
//!
//! This crate provides the status codes, identifiers, and wire codecs shared
//! by the host-side capability traits and the dispatch layer that the native
//! engine calls into.

pub mod types;
pub mod error;
pub mod address;
pub mod consensus;
pub mod codec;

// Re-export commonly used types at the crate root for convenience.
pub use cid::Cid;
pub use types::{
    ActorId, ChainEpoch, Randomness, TokenAmount, MAX_CID_LEN, RAW_CODEC, DAG_CBOR_CODEC,
    block_cid,
};
pub use error::{StatusCode, ReservationStatus};
pub use address::{Address, AddressError, Protocol};
pub use consensus::{ConsensusFault, ConsensusFaultType, FaultReport};
pub use codec::{
    BatchLimits, BlockRecord, CodecError, PlanEntry, ReservationPlan,
    decode_cid, decode_plan, decode_put_many, encode_plan, encode_put_many,
};

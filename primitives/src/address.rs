//! Filecoin-style actor addresses.
//!
//! Binary form is a protocol byte followed by the payload. Only ID addresses
//! (protocol 0, payload = unsigned LEB128) resolve directly to an actor id;
//! every other protocol needs chain state to resolve and is rejected here.

use core::fmt;

use crate::codec::{read_uvarint, write_uvarint};
use crate::types::ActorId;

/// Address protocol tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Protocol {
    Id = 0,
    Secp256k1 = 1,
    Actor = 2,
    Bls = 3,
    Delegated = 4,
}

impl Protocol {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Id),
            1 => Some(Self::Secp256k1),
            2 => Some(Self::Actor),
            3 => Some(Self::Bls),
            4 => Some(Self::Delegated),
            _ => None,
        }
    }
}

/// Address decoding and resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("empty address")]
    Empty,
    #[error("unknown address protocol {0}")]
    UnknownProtocol(u8),
    #[error("invalid address payload: {0}")]
    InvalidPayload(String),
    #[error("address protocol {0:?} cannot be resolved to an actor id without chain state")]
    NotAnId(Protocol),
}

/// A protocol-tagged address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    protocol: Protocol,
    payload: Vec<u8>,
}

impl Address {
    /// Build an ID address.
    pub fn new_id(id: ActorId) -> Self {
        let mut payload = Vec::with_capacity(10);
        write_uvarint(&mut payload, id);
        Self {
            protocol: Protocol::Id,
            payload,
        }
    }

    /// Build a non-ID address from a raw payload.
    ///
    /// The payload is carried opaquely; it is never resolved locally.
    pub fn new_opaque(protocol: Protocol, payload: Vec<u8>) -> Result<Self, AddressError> {
        if protocol == Protocol::Id {
            let (_, used) = read_uvarint(&payload)
                .map_err(|e| AddressError::InvalidPayload(e.to_string()))?;
            if used != payload.len() {
                return Err(AddressError::InvalidPayload("trailing id bytes".into()));
            }
        }
        Ok(Self { protocol, payload })
    }

    /// Decode from the binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let (&tag, payload) = bytes.split_first().ok_or(AddressError::Empty)?;
        let protocol = Protocol::from_u8(tag).ok_or(AddressError::UnknownProtocol(tag))?;
        Self::new_opaque(protocol, payload.to_vec())
    }

    /// Encode to the binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.payload.len());
        out.push(self.protocol as u8);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Resolve to a numeric actor id. Fails for anything but an ID address.
    pub fn id(&self) -> Result<ActorId, AddressError> {
        if self.protocol != Protocol::Id {
            return Err(AddressError::NotAnId(self.protocol));
        }
        let (id, _) = read_uvarint(&self.payload)
            .map_err(|e| AddressError::InvalidPayload(e.to_string()))?;
        Ok(id)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Ok(id) => write!(f, "Address(f0{})", id),
            Err(_) => write!(f, "Address({:?}, {} bytes)", self.protocol, self.payload.len()),
        }
    }
}

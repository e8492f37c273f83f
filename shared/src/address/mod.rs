// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
//! Actor-addressing types: the protocol tag, payload, and the resulting
//! [`Address`].

mod payload;

pub use payload::Payload;

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const PAYLOAD_HASH_LEN: usize = 20;

/// Protocol defines the addressing protocol used to derive data to an address.
/// Only `ID` and `Secp256k1` are modeled; `Secp256k1` is this lineage's sole
/// "account-key" class (§4.4 step 6, §6 "Address classes").
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Protocol {
    /// ID protocol address.
    ID = 0,
    /// SECP256K1 key address, protocol 1. The only address class that the
    /// state tree is permitted to materialize lazily as a fresh account actor.
    Secp256k1 = 1,
    /// Actor protocol address, protocol 2. Never auto-created.
    Actor = 2,
}

impl Protocol {
    /// Returns the account-key address class used by `try_create_account_actor`.
    pub fn is_account_key(self) -> bool {
        matches!(self, Protocol::Secp256k1)
    }

    fn from_byte(b: u8) -> Result<Self, Error> {
        match b {
            0 => Ok(Protocol::ID),
            1 => Ok(Protocol::Secp256k1),
            2 => Ok(Protocol::Actor),
            _ => Err(Error::UnknownProtocol),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown address protocol")]
    UnknownProtocol,
    #[error("invalid address payload length: {0}")]
    InvalidPayloadLength(usize),
    #[error("invalid address bytes")]
    InvalidBytes,
}

/// An actor address: a protocol tag plus its payload.
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Address {
    payload: Payload,
}

impl Address {
    pub fn new_id(id: u64) -> Self {
        Address {
            payload: Payload::ID(id),
        }
    }

    pub fn new_secp256k1(pubkey_hash: [u8; PAYLOAD_HASH_LEN]) -> Self {
        Address {
            payload: Payload::Secp256k1(pubkey_hash),
        }
    }

    pub fn new_actor(data_hash: [u8; PAYLOAD_HASH_LEN]) -> Self {
        Address {
            payload: Payload::Actor(data_hash),
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::from(&self.payload)
    }

    /// Returns true iff this address belongs to the account-key class, the
    /// only class `apply_message` may materialize lazily (§4.4 step 6).
    pub fn is_account_key(&self) -> bool {
        self.protocol().is_account_key()
    }

    pub fn id(&self) -> Option<u64> {
        match self.payload {
            Payload::ID(id) => Some(id),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.payload.to_bytes()
    }

    pub fn from_bytes(bz: &[u8]) -> Result<Self, Error> {
        if bz.len() < 2 {
            return Err(Error::InvalidBytes);
        }
        let protocol = Protocol::from_byte(bz[0])?;
        let payload = Payload::new(protocol, &bz[1..])?;
        Ok(Address { payload })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:?})", self.payload)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_bytes::Bytes::new(&self.to_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bz: serde_bytes::ByteBuf = Deserialize::deserialize(deserializer)?;
        Address::from_bytes(bz.as_ref()).map_err(de::Error::custom)
    }
}

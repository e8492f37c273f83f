// Copyright 2021-2023 Protocol Labs
// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
//! Types shared between the VM core and its surrounding tooling: addresses,
//! token amounts, wire-format messages and receipts, and exit codes.

pub mod address;
pub mod bigint;
pub mod econ;
pub mod error;
pub mod message;
pub mod receipt;

/// Codec tag for raw (non-DAG-CBOR) data.
pub const IPLD_RAW: u64 = 0x55;

/// Multihash code for the identity hash function: a CID using this code
/// carries its payload inline and references no stored bytes (§3).
pub const IDENTITY_HASH: u64 = 0x0;

/// Identifier for actors in the state tree.
pub type ActorID = u64;

/// Method number indicator for calling actor methods.
pub type MethodNum = u64;

/// Reserved method number: a pure value transfer, never dispatched (§4.3).
pub const METHOD_SEND: MethodNum = 0;

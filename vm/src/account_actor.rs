// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The account-key actor: the only code a missing recipient may be lazily
//! materialized as (§4.4 step 6, §6 "Address classes").
//!
//! ## Future direction
//!
//! This coupling between the VM and a concrete actor's code identifier is a
//! simplification: a full actor registry is out of scope (§1), so the
//! invoker keys off the well-known constant below instead of a catalog
//! lookup.

use cid::multihash::Multihash;
use cid::Cid;
use fvm_ipld_encoding::tuple::*;
use statevm_shared::address::Address;
use statevm_shared::{IDENTITY_HASH, IPLD_RAW};

/// State specifies the key address for the actor.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug)]
pub struct State {
    pub address: Address,
}

lazy_static::lazy_static! {
    /// Identity-hash sentinel CID standing in for the account actor's code.
    pub static ref ACCOUNT_ACTOR_CODE_ID: Cid = Cid::new_v1(
        IPLD_RAW,
        Multihash::wrap(IDENTITY_HASH, b"account").unwrap(),
    );
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The well-known init actor code identifier that gates privileged
//! `state_tree()` access from an invocation context (§4.2).
//!
//! A full init actor (address-to-ID allocation, actor-creation factory) is
//! not part of this design: the state tree is keyed directly by address
//! (§3), so there is no ID-indirection layer for an init actor to maintain.
//! What remains is purely the permission marker.

use cid::multihash::Multihash;
use cid::Cid;
use statevm_shared::{IDENTITY_HASH, IPLD_RAW};

lazy_static::lazy_static! {
    pub static ref INIT_ACTOR_CODE_ID: Cid = Cid::new_v1(
        IPLD_RAW,
        Multihash::wrap(IDENTITY_HASH, b"init").unwrap(),
    );
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Per-invocation storage handle over an actor's private sub-tree (§4.1).

use cid::multihash::Code;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::CborStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClassifyResult, Result, VmError};

/// Exposes `get/put/get_head/commit` against the buffered store for a single
/// actor invocation, as specified in §4.1. Created with `head = actor.head`
/// before a call; the caller reads back `get_head()` once the callee returns
/// and stores it on the actor record.
pub struct StorageHandle<'a, B> {
    store: &'a B,
    head: Cid,
}

impl<'a, B: Blockstore> StorageHandle<'a, B> {
    pub fn new(store: &'a B, head: Cid) -> Self {
        StorageHandle { store, head }
    }

    /// `put(value) -> CID`: purely additive, writes to the overlay (§4.1).
    pub fn put<T: Serialize>(&self, value: &T) -> Result<Cid> {
        self.store.put_cbor(value, Code::Blake2b256).or_fatal()
    }

    /// `get(cid) -> T`. Fails with `NotFound` if absent from overlay and base.
    pub fn get<T: DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        self.store
            .get_cbor(cid)
            .or_fatal()?
            .ok_or(VmError::NotFound)
    }

    /// The actor's current storage root as seen by this invocation.
    pub fn get_head(&self) -> Cid {
        self.head
    }

    /// Compare-and-set the handle's head (§4.1, §9 "commit(old,new) check").
    pub fn commit(&mut self, old: Cid, new: Cid) -> Result<()> {
        if old != self.head {
            return Err(VmError::InconsistentBase {
                old,
                current: self.head,
            });
        }
        self.head = new;
        Ok(())
    }
}

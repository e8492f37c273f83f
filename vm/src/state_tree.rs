// Copyright 2021-2023 Protocol Labs
// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
//! The persistent `address -> Actor` mapping (§3 "State tree"). Backed by a
//! HAMT over the buffered store, with a single-slot snapshot/revert overlay
//! per §9's resolution of the "cyclic handle" design note: no stack of
//! snapshots, only the one the top-level `apply_message` takes (§4.4, §9).

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{anyhow, Context as _};
use cid::multihash::Code;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::{Deserialize_tuple, Serialize_tuple};
use fvm_ipld_encoding::CborStore;
use fvm_ipld_hamt::Hamt;
use statevm_shared::address::Address;
use statevm_shared::bigint::bigint_ser;
use statevm_shared::econ::TokenAmount;

use crate::error::{ClassifyResult, Result, VmError};

/// An actor's header as recorded in the state tree (§3 "Actor").
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct Actor {
    /// Identifies the actor's behavior in the invoker registry.
    pub code_id: Cid,
    /// Root of this actor's private storage sub-tree.
    pub head: Cid,
    pub nonce: u64,
    #[serde(with = "bigint_ser")]
    pub balance: TokenAmount,
}

impl Actor {
    pub fn new(code_id: Cid, head: Cid, balance: TokenAmount) -> Self {
        Actor {
            code_id,
            head,
            nonce: 0,
            balance,
        }
    }

    /// Debits `amt`, failing fatally on underflow. Callers must already have
    /// proven affordability (§4.4 step 7); this is an invariant guard, not a
    /// balance check.
    pub fn deduct_funds(&mut self, amt: &TokenAmount) -> Result<()> {
        if &self.balance < amt {
            return Err(VmError::Fatal(anyhow!(
                "debit of {} would underflow balance {}",
                amt,
                self.balance
            )));
        }
        self.balance -= amt;
        Ok(())
    }

    pub fn deposit_funds(&mut self, amt: &TokenAmount) {
        self.balance += amt;
    }
}

pub struct StateTree<B> {
    hamt: Hamt<B, Actor>,
    /// Pending writes not yet folded into `hamt`. `None` means deleted.
    overlay: RefCell<HashMap<Vec<u8>, Option<Actor>>>,
    /// The single saved overlay, set by `snapshot()` and consumed by `revert()`.
    snapshot: RefCell<Option<HashMap<Vec<u8>, Option<Actor>>>>,
}

impl<B> StateTree<B>
where
    B: Blockstore,
{
    /// Creates an empty state tree.
    pub fn new(store: B) -> Result<Self> {
        Ok(StateTree {
            hamt: Hamt::new(store),
            overlay: RefCell::new(HashMap::new()),
            snapshot: RefCell::new(None),
        })
    }

    /// Loads a state tree from a previously flushed root.
    pub fn new_from_root(store: B, root: &Cid) -> Result<Self> {
        let hamt = Hamt::load(root, store)
            .context("failed to load state tree root")
            .or_fatal()?;
        Ok(StateTree {
            hamt,
            overlay: RefCell::new(HashMap::new()),
            snapshot: RefCell::new(None),
        })
    }

    pub fn store(&self) -> &B {
        self.hamt.store()
    }

    /// `state_tree.get(address) -> Actor | NotFound` (§3).
    pub fn get_actor(&self, addr: &Address) -> Result<Option<Actor>> {
        let key = addr.to_bytes();
        if let Some(overlaid) = self.overlay.borrow().get(&key) {
            return Ok(overlaid.clone());
        }
        self.hamt
            .get(&key)
            .with_context(|| format!("failed to look up actor {}", addr))
            .or_fatal()
            .map(|o| o.cloned())
    }

    /// `state_tree.set(address, Actor)` (§3).
    pub fn set_actor(&self, addr: &Address, actor: Actor) {
        self.overlay.borrow_mut().insert(addr.to_bytes(), Some(actor));
    }

    pub fn delete_actor(&self, addr: &Address) {
        self.overlay.borrow_mut().insert(addr.to_bytes(), None);
    }

    /// Mutates an existing actor in place via `f`, re-inserting the result.
    pub fn mutate_actor<F>(&self, addr: &Address, f: F) -> Result<()>
    where
        F: FnOnce(&mut Actor) -> Result<()>,
    {
        let mut actor = self
            .get_actor(addr)?
            .with_context(|| format!("actor {} does not exist", addr))
            .or_fatal()?;
        f(&mut actor)?;
        self.set_actor(addr, actor);
        Ok(())
    }

    /// `state_tree.snapshot()` (§3). Only one snapshot is live at a time;
    /// taking a new one overwrites the last (there is no stack, §9).
    pub fn snapshot(&self) {
        log::debug!("state_tree: snapshot taken");
        *self.snapshot.borrow_mut() = Some(self.overlay.borrow().clone());
    }

    /// `state_tree.revert()` (§3): restores the overlay to the last
    /// snapshot, discarding every mutation made since.
    pub fn revert(&self) {
        log::debug!("state_tree: reverting to last snapshot");
        let restored = self.snapshot.borrow_mut().take().unwrap_or_default();
        *self.overlay.borrow_mut() = restored;
    }

    /// `state_tree.flush() -> CID` (§3): folds the overlay into the HAMT and
    /// returns its root.
    pub fn flush(&mut self) -> Result<Cid> {
        for (key, value) in self.overlay.borrow_mut().drain() {
            match value {
                None => {
                    // Deleting a key that was never committed is a no-op.
                    let _ = self.hamt.delete(&key).or_fatal()?;
                }
                Some(actor) => {
                    self.hamt.set(key.into(), actor).or_fatal()?;
                }
            }
        }
        *self.snapshot.borrow_mut() = None;
        self.hamt.flush().or_fatal()
    }

    /// Iterates every actor currently committed to the HAMT (does not see
    /// uncommitted overlay writes); used by tests and by genesis tooling.
    pub fn for_each<F>(&self, mut f: F) -> anyhow::Result<()>
    where
        F: FnMut(Address, &Actor) -> anyhow::Result<()>,
    {
        self.hamt.for_each(|k, v| {
            let addr = Address::from_bytes(&k.0).map_err(|e| anyhow!(e))?;
            f(addr, v)
        })?;
        Ok(())
    }
}

/// Stores a CBOR object and returns its CID, using the canonical hash code
/// this lineage uses for all internal links.
pub fn put_cbor<B: Blockstore, T: serde::Serialize>(store: &B, obj: &T) -> Result<Cid> {
    store.put_cbor(obj, Code::Blake2b256).or_fatal()
}

#[cfg(test)]
mod tests {
    use fvm_ipld_blockstore::MemoryBlockstore;

    use super::*;

    fn dummy_actor(balance: i64) -> Actor {
        Actor::new(Cid::default(), Cid::default(), TokenAmount::from_atto(balance))
    }

    #[test]
    fn get_set_roundtrip() {
        let tree = StateTree::new(MemoryBlockstore::default()).unwrap();
        let addr = Address::new_id(1);
        assert_eq!(tree.get_actor(&addr).unwrap(), None);
        tree.set_actor(&addr, dummy_actor(100));
        assert_eq!(tree.get_actor(&addr).unwrap().unwrap().balance, TokenAmount::from_atto(100));
    }

    #[test]
    fn snapshot_revert_undoes_overlay_writes() {
        let tree = StateTree::new(MemoryBlockstore::default()).unwrap();
        let addr = Address::new_id(1);
        tree.set_actor(&addr, dummy_actor(100));
        tree.snapshot();
        tree.set_actor(&addr, dummy_actor(1));
        assert_eq!(tree.get_actor(&addr).unwrap().unwrap().balance, TokenAmount::from_atto(1));
        tree.revert();
        assert_eq!(tree.get_actor(&addr).unwrap().unwrap().balance, TokenAmount::from_atto(100));
    }

    #[test]
    fn flush_is_idempotent() {
        let mut tree = StateTree::new(MemoryBlockstore::default()).unwrap();
        let addr = Address::new_id(1);
        tree.set_actor(&addr, dummy_actor(42));
        let root1 = tree.flush().unwrap();
        let root2 = tree.flush().unwrap();
        assert_eq!(root1, root2);
    }
}

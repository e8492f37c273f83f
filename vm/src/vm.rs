// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The `Vm` orchestrator: `apply_message`, `transfer_funds`, `flush` (§4.4-§4.6).

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use num_traits::Zero;
use statevm_shared::address::Address;
use statevm_shared::econ::TokenAmount;
use statevm_shared::error::ExitCode;
use statevm_shared::message::Message;
use statevm_shared::receipt::Receipt;
use statevm_shared::MethodNum;

use crate::account_actor::{self, ACCOUNT_ACTOR_CODE_ID};
use crate::blockstore::BufferedBlockstore;
use crate::context::InvocationContext;
use crate::error::{ClassifyResult, Result, VmError};
use crate::invoker::Invoker;
use crate::state_tree::{put_cbor, Actor, StateTree};
use crate::storage::StorageHandle;

/// One session of message application over a world state (§2, §4.4).
pub struct Vm<BS> {
    state_tree: StateTree<BufferedBlockstore<BS>>,
    invoker: Invoker<BS>,
    height: i64,
    miner: Address,
}

impl<BS> Vm<BS>
where
    BS: Blockstore,
{
    /// `new(base_root, height, miner_addr, chain_store)` (§6).
    pub fn new(
        base_root: &Cid,
        height: i64,
        miner: Address,
        base_store: BS,
        invoker: Invoker<BS>,
    ) -> Result<Self> {
        let buffered = BufferedBlockstore::new(base_store);
        let state_tree = StateTree::new_from_root(buffered, base_root)?;
        Ok(Vm {
            state_tree,
            invoker,
            height,
            miner,
        })
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn store(&self) -> &BufferedBlockstore<BS> {
        self.state_tree.store()
    }

    pub fn state_tree(&self) -> &StateTree<BufferedBlockstore<BS>> {
        &self.state_tree
    }

    /// `invoke(actor, ctx, method, params) -> (bytes, exit_code) | Err` (§4.3, §6).
    pub fn invoke(
        &self,
        actor: &Actor,
        ctx: &mut InvocationContext<'_, BS>,
        method: MethodNum,
        params: &[u8],
    ) -> Result<(Vec<u8>, ExitCode)> {
        let method_fn = self.invoker.resolve(&actor.code_id, method)?;
        method_fn(actor, ctx, params)
    }

    /// `apply_message(&mut self, msg) -> Receipt | Err` (§4.4).
    pub fn apply_message(&mut self, msg: &Message) -> Result<Receipt> {
        msg.check().or_fatal()?;

        // Step 1: snapshot.
        self.state_tree.snapshot();

        // Step 2: resolve sender.
        let mut from = self
            .state_tree
            .get_actor(&msg.from)?
            .ok_or(VmError::SenderNotFound(msg.from))?;

        // Step 3: affordability.
        let total_cost = msg.total_cost();
        if from.balance < total_cost {
            return Err(VmError::InsufficientFunds(msg.from));
        }

        // Step 4: nonce check.
        if msg.nonce != from.nonce {
            return Err(VmError::BadNonce {
                expected: from.nonce,
                got: msg.nonce,
            });
        }

        // Step 5: increment sender nonce.
        from.nonce += 1;
        self.state_tree.set_actor(&msg.from, from.clone());

        // Step 6: resolve or create recipient. The fetched actor is used only
        // to decide whether creation is needed; step 8 re-fetches the
        // recipient fresh so a self-send (from == to) credits on top of
        // step 7's debit instead of clobbering it with this stale snapshot.
        if self.state_tree.get_actor(&msg.to)?.is_none() {
            self.try_create_account_actor(&msg.to)?;
        }

        // Step 7: debit sender.
        let mut from = self
            .state_tree
            .get_actor(&msg.from)?
            .with_context_fatal("sender disappeared mid-pipeline")?;
        from.deduct_funds(&total_cost)?;
        self.state_tree.set_actor(&msg.from, from);

        // Step 8: credit recipient.
        let mut to = self
            .state_tree
            .get_actor(&msg.to)?
            .with_context_fatal("recipient disappeared mid-pipeline")?;
        to.deposit_funds(&msg.value);
        self.state_tree.set_actor(&msg.to, to.clone());

        // Step 9: dispatch.
        let (return_data, exit_code, gas_used) = if msg.method == statevm_shared::METHOD_SEND {
            (Vec::new(), ExitCode::OK, 0)
        } else {
            let to_for_ctx = self
                .state_tree
                .get_actor(&msg.to)?
                .with_context_fatal("recipient disappeared mid-pipeline")?;
            let storage = StorageHandle::new(self.store(), to_for_ctx.head);
            let mut ctx = InvocationContext::new(self, msg.clone(), to_for_ctx.code_id, storage);

            match self.invoke(&to_for_ctx, &mut ctx, msg.method, &msg.params) {
                Err(e) => return Err(e),
                Ok((ret, exit_code)) => {
                    let gas_used = ctx.gas_used();
                    let new_head = ctx.into_storage().get_head();

                    if exit_code.is_success() {
                        self.state_tree.mutate_actor(&msg.to, |a| {
                            a.head = new_head;
                            Ok(())
                        })?;
                        let refund = &msg.gas_price * (msg.gas_limit - gas_used);
                        self.state_tree.mutate_actor(&msg.from, |a| {
                            a.deposit_funds(&refund);
                            Ok(())
                        })?;
                        (ret, exit_code, gas_used)
                    } else {
                        log::debug!("apply_message: dispatch exited {}, reverting", exit_code.0);
                        self.state_tree.revert();
                        let gas_charge = &msg.gas_price * gas_used;
                        self.state_tree
                            .mutate_actor(&msg.from, |a| a.deduct_funds(&gas_charge))?;
                        (Vec::new(), exit_code, gas_used)
                    }
                }
            }
        };

        // Step 10: reward miner.
        let miner_reward = &msg.gas_price * gas_used;
        self.state_tree
            .mutate_actor(&self.miner, |a| {
                a.deposit_funds(&miner_reward);
                Ok(())
            })?;

        Ok(Receipt {
            exit_code,
            return_data: RawBytes::new(return_data),
            gas_used,
        })
    }

    /// `try_create_account_actor`: installs a fresh account actor for `addr`
    /// iff `addr` is of the account-key address class (§4.4 step 6, §6).
    fn try_create_account_actor(&mut self, addr: &Address) -> Result<Actor> {
        if !addr.is_account_key() {
            return Err(VmError::RecipientMissing(*addr));
        }
        let state = account_actor::State { address: *addr };
        let head = put_cbor(self.store(), &state)?;
        let actor = Actor::new(*ACCOUNT_ACTOR_CODE_ID, head, TokenAmount::zero());
        self.state_tree.set_actor(addr, actor.clone());
        Ok(actor)
    }

    /// `transfer_funds(&mut self, from, to, amount)` (§4.5, §9.2).
    pub fn transfer_funds(&mut self, from: Address, to: Address, amount: TokenAmount) -> Result<()> {
        if from == to {
            return Ok(());
        }
        self.state_tree
            .mutate_actor(&from, |a| a.deduct_funds(&amount))?;
        self.state_tree.mutate_actor(&to, |a| {
            a.deposit_funds(&amount);
            Ok(())
        })?;
        Ok(())
    }

    /// `flush(&mut self, cancel)` (§4.6). Cancellation is left to the caller:
    /// dropping the future/aborting the call before it returns leaves the
    /// durable store with, at most, a partial subgraph that no root
    /// references, per §5 "Cancellation".
    pub fn flush(&mut self) -> Result<Cid> {
        let root = self.state_tree.flush()?;
        self.state_tree.store().flush(&root)?;
        Ok(root)
    }
}

trait WithContextFatal<T> {
    fn with_context_fatal(self, msg: &str) -> Result<T>;
}

impl<T> WithContextFatal<T> for Option<T> {
    fn with_context_fatal(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| VmError::Fatal(anyhow::anyhow!("{}", msg)))
    }
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The execution environment handed to an actor method (§4.2).

use std::cell::Cell;

use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use statevm_shared::address::Address;
use statevm_shared::econ::TokenAmount;
use statevm_shared::error::ExitCode;
use statevm_shared::message::Message;
use statevm_shared::MethodNum;

use crate::blockstore::BufferedBlockstore;
use crate::error::{Result, VmError};
use crate::init_actor::INIT_ACTOR_CODE_ID;
use crate::state_tree::StateTree;
use crate::storage::StorageHandle;
use crate::vm::Vm;

/// Handed to a method implementation for the duration of one dispatch.
/// Holds the *incoming* message for this frame (not necessarily the
/// originating top-level message — see `send`), the storage handle for the
/// callee's private sub-tree, and a capability to issue nested sends.
/// Generic over the raw backing store `BS`, matching `Vm<BS>`.
pub struct InvocationContext<'a, BS: Blockstore> {
    vm: &'a Vm<BS>,
    message: Message,
    /// The callee this context was built for; used to gate `state_tree()`.
    callee_code_id: cid::Cid,
    storage: StorageHandle<'a, BufferedBlockstore<BS>>,
    gas_used: Cell<i64>,
}

impl<'a, BS: Blockstore> InvocationContext<'a, BS> {
    pub fn new(
        vm: &'a Vm<BS>,
        message: Message,
        callee_code_id: cid::Cid,
        storage: StorageHandle<'a, BufferedBlockstore<BS>>,
    ) -> Self {
        InvocationContext {
            vm,
            message,
            callee_code_id,
            storage,
            gas_used: Cell::new(0),
        }
    }

    /// `message()` (§4.2): the incoming message to *this* frame.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// `block_height()` (§4.2).
    pub fn block_height(&self) -> i64 {
        self.vm.height()
    }

    /// `storage()` (§4.2, §4.1).
    pub fn storage(&mut self) -> &mut StorageHandle<'a, BufferedBlockstore<BS>> {
        &mut self.storage
    }

    pub fn into_storage(self) -> StorageHandle<'a, BufferedBlockstore<BS>> {
        self.storage
    }

    /// `gas_used()` (§4.2): the running gas meter for this context. This
    /// design does not implement a gas schedule (§1 non-goals); the meter
    /// always reads back what was explicitly recorded via `record_gas`,
    /// which nothing in this crate calls outside of a method implementation
    /// choosing to report its own usage.
    pub fn gas_used(&self) -> i64 {
        self.gas_used.get()
    }

    pub fn record_gas(&self, used: i64) {
        self.gas_used.set(used);
    }

    /// `state_tree()` (§4.2): privileged whole-tree access, permitted only
    /// when the callee is the well-known init actor.
    pub fn state_tree(&self) -> Result<&StateTree<BufferedBlockstore<BS>>> {
        if self.callee_code_id != *INIT_ACTOR_CODE_ID {
            return Err(VmError::PermissionDenied);
        }
        Ok(self.vm.state_tree())
    }

    /// `send(to, method, value, params) -> (return_bytes, exit_code)` (§4.2).
    ///
    /// Per §9.1, `send` does not move `value` on its own: the VM does not
    /// debit the caller or credit the callee. `value` is passed through only
    /// for the callee's own inspection via `message().value`.
    pub fn send(
        &self,
        to: Address,
        method: MethodNum,
        value: TokenAmount,
        params: Vec<u8>,
    ) -> Result<(Vec<u8>, ExitCode)> {
        log::trace!("send: from={} to={} method={}", self.message.from, to, method);

        // Step 2: resolve the callee; no implicit account creation inside
        // `send`. Unconditional even for method 0: the method-0 dispatch
        // skip below only elides invocation, not callee resolution.
        let callee = self
            .vm
            .state_tree()
            .get_actor(&to)?
            .ok_or(VmError::RecipientMissing(to))?;

        if method == statevm_shared::METHOD_SEND {
            return Ok((Vec::new(), ExitCode::OK));
        }

        let sub_message = Message {
            from: self.message.from,
            to,
            nonce: 0,
            value,
            method,
            params: RawBytes::new(params.clone()),
            gas_price: TokenAmount::from_atto(0),
            gas_limit: self.message.gas_limit,
        };

        let sub_storage = StorageHandle::new(self.vm.store(), callee.head);
        let mut sub_ctx = InvocationContext::new(self.vm, sub_message, callee.code_id, sub_storage);

        let result = self.vm.invoke(&callee, &mut sub_ctx, method, &params);

        // Step 5: propagate the callee's new storage head back, on success.
        if let Ok((_, exit_code)) = &result {
            if exit_code.is_success() {
                let new_head = sub_ctx.storage.get_head();
                self.vm.state_tree().mutate_actor(&to, |a| {
                    a.head = new_head;
                    Ok(())
                })?;
            }
        }

        result
    }
}

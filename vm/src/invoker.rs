// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! `(code_id, method_number) -> method_fn` dispatch table (§4.3).

use std::collections::HashMap;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use statevm_shared::error::ExitCode;
use statevm_shared::MethodNum;

use crate::context::InvocationContext;
use crate::error::{Result, VmError};
use crate::state_tree::Actor;

/// An actor method implementation: given the callee's current header, its
/// invocation context, and raw params, returns return bytes and an exit
/// code, or a hard error for catastrophic (non-exit-code) failures.
/// Generic over the raw backing store, matching `Vm<BS>`.
pub type MethodFn<BS> =
    fn(&Actor, &mut InvocationContext<'_, BS>, &[u8]) -> Result<(Vec<u8>, ExitCode)>;

/// Read-only once constructed (§4.3): built at VM creation via `register`,
/// then only ever queried by `invoke`.
pub struct Invoker<BS> {
    methods: HashMap<(Cid, MethodNum), MethodFn<BS>>,
}

impl<BS> Default for Invoker<BS> {
    fn default() -> Self {
        Invoker {
            methods: HashMap::new(),
        }
    }
}

impl<BS: Blockstore> Invoker<BS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the dispatch table. `method = 0` (`METHOD_SEND`) must never
    /// be registered: it is a reserved sentinel short-circuited by
    /// `apply_message` before dispatch ever happens (§4.3).
    pub fn register(&mut self, code_id: Cid, method: MethodNum, f: MethodFn<BS>) {
        debug_assert_ne!(method, statevm_shared::METHOD_SEND, "method 0 is reserved");
        self.methods.insert((code_id, method), f);
    }

    pub fn resolve(&self, code_id: &Cid, method: MethodNum) -> Result<MethodFn<BS>> {
        self.methods
            .get(&(*code_id, method))
            .copied()
            .ok_or_else(|| VmError::InvokerMissing {
                code: *code_id,
                method,
            })
    }
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! A deterministic message-driven state-transition virtual machine for a
//! blockchain ledger: balance/nonce preflight, actor dispatch, nested
//! inter-actor invocation, snapshot/rollback, and the content-addressed
//! staging layer that publishes a message's effects as a new state root.
//!
//! ## Logging
//!
//! This crate emits logs using the `log` façade at the granularity described
//! for each module; pick a backend (`env_logger` in tests, anything else in
//! a host binary) in the consuming application.

pub mod blockstore;
pub mod context;
pub mod error;
pub mod invoker;
pub mod state_tree;
pub mod storage;
pub mod vm;

mod account_actor;
mod init_actor;

pub use context::InvocationContext;
pub use error::{Result, VmError};
pub use invoker::{Invoker, MethodFn};
pub use state_tree::{Actor, StateTree};
pub use storage::StorageHandle;
pub use vm::Vm;

/// The well-known code identifier a missing account-class recipient is
/// lazily materialized with (§4.4 step 6).
pub fn account_actor_code_id() -> &'static cid::Cid {
    &account_actor::ACCOUNT_ACTOR_CODE_ID
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The hard-error taxonomy of §7, plus the `.or_fatal()` convention used
//! throughout this crate to classify lower-layer (storage/encoding) failures.

use statevm_shared::address::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("sender {0} not found in state tree")]
    SenderNotFound(Address),

    #[error("message nonce {got} does not match sender nonce {expected}")]
    BadNonce { expected: u64, got: u64 },

    #[error("sender {0} has insufficient funds")]
    InsufficientFunds(Address),

    #[error("recipient {0} missing and not of the account-key address class")]
    RecipientMissing(Address),

    #[error("no method registered for code {code} method {method}")]
    InvokerMissing { code: cid::Cid, method: u64 },

    #[error("storage commit failed: base {old} does not match current head {current}")]
    InconsistentBase { old: cid::Cid, current: cid::Cid },

    #[error("permission denied: state_tree() is only available to the init actor")]
    PermissionDenied,

    #[error("cid or object not found")]
    NotFound,

    /// Invariant violations: conditions that should be impossible given an
    /// honest caller and a correctly behaving invoker (§7 last row, §9.3).
    /// These indicate a programmer error, not a bad input, and are never
    /// recovered from within `apply_message`.
    #[error("fatal: {0}")]
    Fatal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VmError>;

/// Lets call sites turn a `Result<T, E: Into<anyhow::Error>>` from a storage
/// or encoding call into a `Result<T, VmError>` via `.or_fatal()`, keeping
/// "this is one of our classified errors" distinct from "something below us
/// broke in a way we didn't anticipate" (§10.2).
pub trait ClassifyResult<T> {
    fn or_fatal(self) -> Result<T>;
}

impl<T, E> ClassifyResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_fatal(self) -> Result<T> {
        self.map_err(|e| VmError::Fatal(e.into()))
    }
}

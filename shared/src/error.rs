// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

/// ExitCode defines the exit code returned by an actor method invocation.
/// `0` is success; any other value is a soft failure that causes `apply_message`
/// to revert the call's state changes while still charging gas (§7, §9.3).
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCode(pub u8);

impl ExitCode {
    pub const OK: ExitCode = ExitCode(0);

    pub fn is_success(self) -> bool {
        self == ExitCode::OK
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit code: {}", self.0)
    }
}

impl From<u8> for ExitCode {
    fn from(v: u8) -> Self {
        ExitCode(v)
    }
}

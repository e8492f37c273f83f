// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::{Cbor, RawBytes};
use serde_tuple::{Deserialize_tuple, Serialize_tuple};

use crate::error::ExitCode;

/// Result of applying one message (§3 "Receipt", §6 "Receipt serialization").
#[derive(Debug, PartialEq, Eq, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct Receipt {
    pub exit_code: ExitCode,
    pub return_data: RawBytes,
    pub gas_used: i64,
}

impl Cbor for Receipt {}

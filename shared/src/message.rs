// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::anyhow;
use fvm_ipld_encoding::{Cbor, RawBytes};
use serde_tuple::{Deserialize_tuple, Serialize_tuple};

use crate::address::Address;
use crate::econ::TokenAmount;
use crate::MethodNum;

/// A top-level or nested VM message, as specified by §3 "Message".
#[derive(PartialEq, Clone, Debug, Hash, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: RawBytes,
    pub gas_price: TokenAmount,
    pub gas_limit: i64,
}

impl Cbor for Message {}

impl Message {
    /// Basic structural checks, run before the message ever reaches the pipeline.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.gas_limit == 0 {
            return Err(anyhow!("message has no gas limit set"));
        }
        if self.gas_limit < 0 {
            return Err(anyhow!("message has negative gas limit"));
        }
        if self.value.is_negative() {
            return Err(anyhow!("message has negative value"));
        }
        if self.gas_price.is_negative() {
            return Err(anyhow!("message has negative gas price"));
        }
        Ok(())
    }

    /// `total_cost` of §4.4 step 3: `value + gas_limit * gas_price`.
    pub fn total_cost(&self) -> TokenAmount {
        &self.value + &self.gas_price * self.gas_limit
    }
}

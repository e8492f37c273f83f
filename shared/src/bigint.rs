// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
//! Canonical big-integer (de)serialization: minimal big-endian unsigned bytes,
//! matching §6's receipt wire format for `gas_used`.

pub mod bigint_ser {
    use num_bigint::{BigInt, Sign};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(int: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (sign, bytes) = int.to_bytes_be();
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.push(if sign == Sign::Minus { 1u8 } else { 0u8 });
        buf.extend_from_slice(&bytes);
        serde_bytes::Bytes::new(&buf).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
    where
        D: Deserializer<'de>,
    {
        let buf: serde_bytes::ByteBuf = Deserialize::deserialize(deserializer)?;
        let bz = buf.as_ref();
        if bz.is_empty() {
            return Ok(BigInt::from(0));
        }
        let sign = if bz[0] == 1 { Sign::Minus } else { Sign::Plus };
        Ok(BigInt::from_bytes_be(sign, &bz[1..]))
    }
}

// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The overlay store used for a VM session (§4.6).

mod buffered;

pub use buffered::BufferedBlockstore;

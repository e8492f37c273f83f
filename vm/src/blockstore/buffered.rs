// Copyright 2021-2023 Protocol Labs
// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use anyhow::anyhow;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;

use crate::error::{ClassifyResult, Result};

const DAG_CBOR: u64 = 0x71;
const IDENTITY_HASH: u64 = 0x0;

/// Wrapper around a durable [`Blockstore`] that captures every write in an
/// in-memory overlay until [`BufferedBlockstore::flush`] publishes a subgraph
/// (§4.6). Not thread-safe; a VM session owns exactly one of these.
#[derive(Debug)]
pub struct BufferedBlockstore<BS> {
    base: BS,
    write: RefCell<HashMap<Cid, Vec<u8>>>,
}

impl<BS> BufferedBlockstore<BS>
where
    BS: Blockstore,
{
    pub fn new(base: BS) -> Self {
        Self {
            base,
            write: Default::default(),
        }
    }

    pub fn into_inner(self) -> BS {
        self.base
    }

    pub fn base(&self) -> &BS {
        &self.base
    }

    /// Flushes the buffered overlay reachable from `root` into the durable
    /// store, post-order, skipping any subtree the durable store already has
    /// and any identity-hash CID (§4.6 steps 2-3).
    pub fn flush(&self, root: &Cid) -> Result<()> {
        if is_identity(root) {
            return Ok(());
        }
        let mut buffer = Vec::new();
        let w = self.write.borrow();
        copy_rec(&self.base, &w, *root, &mut buffer).or_fatal()?;
        self.base
            .put_many_keyed(buffer.into_iter().map(|(c, b)| (c, b.to_vec())))
            .or_fatal()?;
        drop(w);
        self.write.borrow_mut().clear();
        Ok(())
    }
}

fn is_identity(cid: &Cid) -> bool {
    cid.hash().code() == IDENTITY_HASH
}

/// Reads just enough of a CBOR header to know its major type and length/extra
/// value, without deserializing the whole payload (RFC 7049 Appendix C).
fn cbor_read_header_buf<B: Read>(br: &mut B, scratch: &mut [u8]) -> anyhow::Result<(u8, usize)> {
    let first = br.read_u8()?;
    let maj = (first & 0xe0) >> 5;
    let low = first & 0x1f;

    if low < 24 {
        Ok((maj, low as usize))
    } else if low == 24 {
        Ok((maj, br.read_u8()? as usize))
    } else if low == 25 {
        br.read_exact(&mut scratch[..2])?;
        Ok((maj, BigEndian::read_u16(&scratch[..2]) as usize))
    } else if low == 26 {
        br.read_exact(&mut scratch[..4])?;
        Ok((maj, BigEndian::read_u32(&scratch[..4]) as usize))
    } else if low == 27 {
        br.read_exact(&mut scratch[..8])?;
        Ok((maj, BigEndian::read_u64(&scratch[..8]) as usize))
    } else {
        Err(anyhow!("invalid cbor header"))
    }
}

/// Scans a CBOR-encoded IPLD buffer for embedded CID links (tag 42) without
/// fully deserializing it.
fn scan_for_links<B: Read + Seek, F>(buf: &mut B, mut callback: F) -> anyhow::Result<()>
where
    F: FnMut(Cid) -> anyhow::Result<()>,
{
    let mut scratch: [u8; 100] = [0; 100];
    let mut remaining = 1;
    while remaining > 0 {
        let (maj, extra) = cbor_read_header_buf(buf, &mut scratch)?;
        match maj {
            0 | 1 | 7 => {}
            2 | 3 => {
                buf.seek(std::io::SeekFrom::Current(extra as i64))?;
            }
            6 => {
                if extra == 42 {
                    let (maj, extra) = cbor_read_header_buf(buf, &mut scratch)?;
                    if maj != 2 {
                        return Err(anyhow!("expected cbor byte string for CID tag"));
                    }
                    if extra > scratch.len() {
                        return Err(anyhow!("CID link too long"));
                    }
                    buf.read_exact(&mut scratch[..extra])?;
                    callback(Cid::try_from(&scratch[1..extra])?)?;
                } else {
                    remaining += 1;
                }
            }
            4 => remaining += extra,
            5 => remaining += extra * 2,
            _ => return Err(anyhow!("unhandled cbor major type: {}", maj)),
        }
        remaining -= 1;
    }
    Ok(())
}

/// Copies the IPLD DAG under `root` from the write overlay into `buffer`,
/// post-order: children are appended before their parent, and a subtree
/// already present in `base` is skipped entirely (§4.6 step 2).
fn copy_rec<'a, BS: Blockstore>(
    base: &BS,
    cache: &'a HashMap<Cid, Vec<u8>>,
    root: Cid,
    buffer: &mut Vec<(Cid, &'a [u8])>,
) -> anyhow::Result<()> {
    if root.codec() != DAG_CBOR || is_identity(&root) {
        return Ok(());
    }
    if base.has(&root)? {
        return Ok(());
    }

    let block = &*cache
        .get(&root)
        .ok_or_else(|| anyhow!("missing link ({}) while flushing buffered store", root))?;

    scan_for_links(&mut Cursor::new(block), |link| {
        if link.codec() != DAG_CBOR || is_identity(&link) {
            return Ok(());
        }
        if !cache.contains_key(&link) {
            return Ok(());
        }
        copy_rec(base, cache, link, buffer)
    })?;

    buffer.push((root, block));
    Ok(())
}

impl<BS> Blockstore for BufferedBlockstore<BS>
where
    BS: Blockstore,
{
    fn get(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        if let Some(data) = self.write.borrow().get(cid) {
            Ok(Some(data.clone()))
        } else {
            self.base.get(cid)
        }
    }

    fn put_keyed(&self, cid: &Cid, buf: &[u8]) -> anyhow::Result<()> {
        self.write.borrow_mut().insert(*cid, Vec::from(buf));
        Ok(())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.write.borrow().contains_key(k) || self.base.has(k)?)
    }

    fn put_many_keyed<D, I>(&self, blocks: I) -> anyhow::Result<()>
    where
        Self: Sized,
        D: AsRef<[u8]>,
        I: IntoIterator<Item = (Cid, D)>,
    {
        self.write
            .borrow_mut()
            .extend(blocks.into_iter().map(|(k, v)| (k, v.as_ref().into())));
        Ok(())
    }
}

use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Cursor;

use crate::checksum;
use crate::io_engine::*;
use crate::pdata::btree::*;
use crate::pdata::unpack::*;

//------------------------------------------

// Builds btrees bottom up from sorted entries: first the leaves, then
// each level of internal nodes above them until a single root remains.
// Blocks are handed out sequentially, nothing is ever freed.

/// Pack the given node ready to write to disk.
pub fn pack_node<W: WriteBytesExt, V: Pack + Unpack>(node: &Node<V>, w: &mut W) -> Result<()> {
    fn pack_keys<W: WriteBytesExt>(header: &NodeHeader, keys: &[u64], w: &mut W) -> Result<()> {
        header.pack(w)?;
        for k in keys {
            w.write_u64::<LittleEndian>(*k)?;
        }

        // pad with zeroes
        for _i in keys.len()..header.max_entries as usize {
            w.write_u64::<LittleEndian>(0)?;
        }
        Ok(())
    }

    match node {
        Node::Internal {
            header,
            keys,
            values,
        } => {
            pack_keys(header, keys, w)?;
            for v in values {
                v.pack(w)?;
            }
        }
        Node::Leaf {
            header,
            keys,
            values,
        } => {
            pack_keys(header, keys, w)?;
            for v in values {
                v.pack(w)?;
            }
        }
    }

    Ok(())
}

pub fn calc_max_entries<V: Unpack>() -> usize {
    let elt_size = 8 + V::disk_size() as usize;
    let total = (BLOCK_SIZE - NODE_HEADER_SIZE) / elt_size;
    (total / 3) * 3
}

// Splits nr entries into node sized runs, every run holding at least a
// third of max so the result passes the underfull check.
fn node_sizes(nr: usize, max: usize) -> Vec<usize> {
    if nr <= max {
        return vec![nr];
    }

    let mut sizes = vec![max; nr / max];
    let rem = nr % max;
    if rem >= max / 3 {
        sizes.push(rem);
    } else if rem > 0 {
        let total = max + rem;
        sizes.pop();
        sizes.push(total - total / 2);
        sizes.push(total / 2);
    }
    sizes
}

//------------------------------------------

pub struct NodeWriter<'a> {
    engine: &'a dyn IoEngine,
    next_free: u64,
}

impl<'a> NodeWriter<'a> {
    pub fn new(engine: &'a dyn IoEngine, first_free: u64) -> Self {
        NodeWriter {
            engine,
            next_free: first_free,
        }
    }

    pub fn engine(&self) -> &'a dyn IoEngine {
        self.engine
    }

    /// The first block that hasn't been handed out yet.
    pub fn next_free(&self) -> u64 {
        self.next_free
    }

    pub fn alloc(&mut self) -> Result<u64> {
        if self.next_free >= self.engine.get_nr_blocks() {
            return Err(anyhow!("out of metadata space"));
        }
        let b = self.next_free;
        self.next_free += 1;
        Ok(b)
    }

    fn write_node<V: Pack + Unpack>(&mut self, node: Node<V>) -> Result<u64> {
        let loc = node.get_header().block;
        let mut b = Block::zeroed(loc);
        pack_node(&node, &mut Cursor::new(b.get_data_mut()))?;
        checksum::write_checksum(b.get_data_mut(), checksum::BT::NODE)?;
        self.engine.write(&b)?;
        Ok(loc)
    }

    fn write_leaf<V: Pack + Unpack>(&mut self, keys: Vec<u64>, values: Vec<V>) -> Result<u64> {
        let header = NodeHeader {
            block: self.alloc()?,
            is_leaf: true,
            nr_entries: keys.len() as u32,
            max_entries: calc_max_entries::<V>() as u32,
            value_size: V::disk_size(),
        };
        self.write_node(Node::Leaf {
            header,
            keys,
            values,
        })
    }

    fn write_internal(&mut self, keys: Vec<u64>, values: Vec<u64>) -> Result<u64> {
        let header = NodeHeader {
            block: self.alloc()?,
            is_leaf: false,
            nr_entries: keys.len() as u32,
            max_entries: calc_max_entries::<u64>() as u32,
            value_size: u64::disk_size(),
        };
        self.write_node::<u64>(Node::Internal {
            header,
            keys,
            values,
        })
    }
}

/// Writes a btree holding the given entries, which must be sorted by key.
/// Returns the root block.
pub fn build_btree<V: Pack + Unpack + Clone>(
    w: &mut NodeWriter,
    entries: &[(u64, V)],
) -> Result<u64> {
    if entries.windows(2).any(|p| p[0].0 >= p[1].0) {
        return Err(anyhow!("btree entries must have ascending keys"));
    }

    // (first key, block) for every node of the current level
    let mut level = Vec::new();
    let mut begin = 0;
    for n in node_sizes(entries.len(), calc_max_entries::<V>()) {
        let run = &entries[begin..begin + n];
        let keys = run.iter().map(|(k, _)| *k).collect();
        let values = run.iter().map(|(_, v)| v.clone()).collect();
        let first = run.first().map_or(0, |(k, _)| *k);
        level.push((first, w.write_leaf(keys, values)?));
        begin += n;
    }

    while level.len() > 1 {
        let mut next = Vec::new();
        let mut begin = 0;
        for n in node_sizes(level.len(), calc_max_entries::<u64>()) {
            let run = &level[begin..begin + n];
            let keys = run.iter().map(|(k, _)| *k).collect();
            let values = run.iter().map(|(_, b)| *b).collect();
            next.push((run[0].0, w.write_internal(keys, values)?));
            begin += n;
        }
        level = next;
    }

    Ok(level[0].1)
}

//------------------------------------------


//------------------------------------------

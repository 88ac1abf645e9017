use byteorder::{LittleEndian, WriteBytesExt};
use nom::{number::complete::*, IResult};
use std::fmt;
use std::io;
use thiserror::Error;

use crate::checksum;
use crate::io_engine::*;
use crate::pdata::unpack::*;

//------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<u64>,
    pub end: Option<u64>, // This is the one-past-the-end value
}

impl KeyRange {
    pub fn new() -> KeyRange {
        KeyRange {
            start: None,
            end: None,
        }
    }

    // None will be returned if either range would be zero length
    fn split(&self, n: u64) -> Option<(KeyRange, KeyRange)> {
        let after_start = self.start.map_or(true, |s| s < n);
        let before_end = self.end.map_or(true, |e| n < e);

        if after_start && before_end {
            Some((
                KeyRange {
                    start: self.start,
                    end: Some(n),
                },
                KeyRange {
                    start: Some(n),
                    end: self.end,
                },
            ))
        } else {
            None
        }
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "[..]"),
            (None, Some(e)) => write!(f, "[..{}]", e),
            (Some(s), None) => write!(f, "[{}..]", s),
            (Some(s), Some(e)) => write!(f, "[{}..{}]", s, e),
        }
    }
}

/// Divides the range covered by an internal node between its children.
pub fn split_key_ranges(path: &[u64], kr: &KeyRange, keys: &[u64]) -> Result<Vec<KeyRange>> {
    if keys.is_empty() {
        return Err(context_err(path, "split_key_ranges: no keys present"));
    }

    let mut krs = Vec::with_capacity(keys.len());

    // The first key gives the lower bound
    let mut kr = KeyRange {
        start: Some(keys[0]),
        end: kr.end,
    };

    for k in keys.iter().skip(1) {
        match kr.split(*k) {
            None => {
                return Err(context_err(
                    path,
                    &format!("couldn't split key range {} at {}", kr, k),
                ))
            }
            Some((first, rest)) => {
                krs.push(first);
                kr = rest;
            }
        }
    }

    krs.push(kr);

    Ok(krs)
}

//------------------------------------------

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    #[error("io error")]
    IoError,
    #[error("not a btree node")]
    NotANode,
    #[error("blocknr mismatch")]
    BlockNrMismatch,
    #[error("value_size mismatch")]
    ValueSizeMismatch,
    #[error("max_entries is too large")]
    MaxEntriesTooLarge,
    #[error("max_entries is not divisible by 3")]
    MaxEntriesNotDivisible,
    #[error("nr_entries > max_entries")]
    NumEntriesTooLarge,
    #[error("nr_entries < max_entries / 3")]
    NumEntriesTooSmall,
    #[error("keys out of order")]
    KeysOutOfOrder,
    #[error("incomplete data")]
    IncompleteData,
}

#[derive(Error, Clone, Debug)]
pub enum BTreeError {
    #[error("node error: {0}")]
    NodeError(NodeError),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("{1}, effecting keys {0}")]
    KeyContext(KeyRange, Box<BTreeError>),

    #[error("{1}, path {0:?}")]
    Path(Vec<u64>, Box<BTreeError>),
}

pub fn node_err(path: &[u64], e: NodeError) -> BTreeError {
    BTreeError::Path(path.to_vec(), Box::new(BTreeError::NodeError(e)))
}

pub fn io_err(path: &[u64]) -> BTreeError {
    node_err(path, NodeError::IoError)
}

pub fn context_err(path: &[u64], msg: &str) -> BTreeError {
    BTreeError::Path(
        path.to_vec(),
        Box::new(BTreeError::ContextError(msg.to_string())),
    )
}

impl BTreeError {
    pub fn keys_context(self, keys: &KeyRange) -> BTreeError {
        BTreeError::KeyContext(keys.clone(), Box::new(self))
    }
}

pub type Result<T> = std::result::Result<T, BTreeError>;

//------------------------------------------

pub const NODE_HEADER_SIZE: usize = 32;

const INTERNAL_NODE: u32 = 1;
const LEAF_NODE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeader {
    pub block: u64,
    pub is_leaf: bool,
    pub nr_entries: u32,
    pub max_entries: u32,
    pub value_size: u32,
}

impl Unpack for NodeHeader {
    fn disk_size() -> u32 {
        NODE_HEADER_SIZE as u32
    }

    fn unpack(data: &[u8]) -> IResult<&[u8], NodeHeader> {
        let (i, _csum) = le_u32(data)?;
        let (i, flags) = le_u32(i)?;
        let (i, block) = le_u64(i)?;
        let (i, nr_entries) = le_u32(i)?;
        let (i, max_entries) = le_u32(i)?;
        let (i, value_size) = le_u32(i)?;
        let (i, _padding) = le_u32(i)?;

        Ok((
            i,
            NodeHeader {
                block,
                is_leaf: flags == LEAF_NODE,
                nr_entries,
                max_entries,
                value_size,
            },
        ))
    }
}

impl Pack for NodeHeader {
    fn pack<W: WriteBytesExt>(&self, w: &mut W) -> io::Result<()> {
        // the checksum is written once the whole node is packed
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(if self.is_leaf {
            LEAF_NODE
        } else {
            INTERNAL_NODE
        })?;
        w.write_u64::<LittleEndian>(self.block)?;
        w.write_u32::<LittleEndian>(self.nr_entries)?;
        w.write_u32::<LittleEndian>(self.max_entries)?;
        w.write_u32::<LittleEndian>(self.value_size)?;
        w.write_u32::<LittleEndian>(0)
    }
}

#[derive(Clone, Debug)]
pub enum Node<V: Unpack> {
    Internal {
        header: NodeHeader,
        keys: Vec<u64>,
        values: Vec<u64>,
    },
    Leaf {
        header: NodeHeader,
        keys: Vec<u64>,
        values: Vec<V>,
    },
}

impl<V: Unpack> Node<V> {
    pub fn get_header(&self) -> &NodeHeader {
        use Node::*;
        match self {
            Internal { header, .. } => header,
            Leaf { header, .. } => header,
        }
    }
}

fn convert_result<'a, V>(path: &[u64], r: IResult<&'a [u8], V>) -> Result<(&'a [u8], V)> {
    r.map_err(|_| node_err(path, NodeError::IncompleteData))
}

/// Decodes a node without looking at its checksum.
pub fn unpack_node<V: Unpack>(
    path: &[u64],
    data: &[u8],
    ignore_non_fatal: bool,
    is_root: bool,
) -> Result<Node<V>> {
    use nom::multi::count;

    let (i, header) = convert_result(path, NodeHeader::unpack(data))?;

    if header.is_leaf && header.value_size != V::disk_size() {
        return Err(node_err(path, NodeError::ValueSizeMismatch));
    }

    let elt_size = header.value_size as usize + 8;
    if elt_size * header.max_entries as usize + NODE_HEADER_SIZE > BLOCK_SIZE {
        return Err(node_err(path, NodeError::MaxEntriesTooLarge));
    }

    if header.nr_entries > header.max_entries {
        return Err(node_err(path, NodeError::NumEntriesTooLarge));
    }

    if !ignore_non_fatal {
        if header.max_entries % 3 != 0 {
            return Err(node_err(path, NodeError::MaxEntriesNotDivisible));
        }

        if !is_root && header.nr_entries < header.max_entries / 3 {
            return Err(node_err(path, NodeError::NumEntriesTooSmall));
        }
    }

    let (i, keys) = convert_result(path, count(le_u64, header.nr_entries as usize)(i))?;

    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(node_err(path, NodeError::KeysOutOfOrder));
    }

    let nr_free = header.max_entries - header.nr_entries;
    let (i, _padding) = convert_result(path, count(le_u64, nr_free as usize)(i))?;

    if header.is_leaf {
        let (_i, values) = convert_result(path, count(V::unpack, header.nr_entries as usize)(i))?;

        Ok(Node::Leaf {
            header,
            keys,
            values,
        })
    } else {
        let (_i, values) = convert_result(path, count(le_u64, header.nr_entries as usize)(i))?;

        Ok(Node::Internal {
            header,
            keys,
            values,
        })
    }
}

/// Verifies the checksum and location of a node block before decoding it.
pub fn check_and_unpack_node<V: Unpack>(
    path: &[u64],
    b: &Block,
    ignore_non_fatal: bool,
    is_root: bool,
) -> Result<Node<V>> {
    if checksum::metadata_block_type(b.get_data()) != checksum::BT::NODE {
        return Err(node_err(path, NodeError::NotANode));
    }

    let node = unpack_node::<V>(path, b.get_data(), ignore_non_fatal, is_root)?;
    if node.get_header().block != b.loc {
        return Err(node_err(path, NodeError::BlockNrMismatch));
    }

    Ok(node)
}

//------------------------------------------


//------------------------------------------

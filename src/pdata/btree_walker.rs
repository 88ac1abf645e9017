use std::sync::Arc;

use crate::io_engine::*;
use crate::pdata::btree::*;
use crate::pdata::unpack::*;


//------------------------------------------

pub trait NodeVisitor<V: Unpack> {
    fn visit(
        &mut self,
        path: &[u64],
        kr: &KeyRange,
        header: &NodeHeader,
        keys: &[u64],
        values: &[V],
    ) -> anyhow::Result<()>;

    // Called once for every subtree that couldn't be read.  The walk skips
    // the subtree if this returns Ok, and stops if it returns an error.
    fn damaged(&mut self, path: &[u64], kr: &KeyRange, err: &BTreeError) -> anyhow::Result<()>;
}

/// Depth first walk over a btree, leaves are visited in key order.
pub struct BTreeWalker {
    engine: Arc<dyn IoEngine + Send + Sync>,
    ignore_non_fatal: bool,
}

impl BTreeWalker {
    pub fn new(engine: Arc<dyn IoEngine + Send + Sync>, ignore_non_fatal: bool) -> BTreeWalker {
        BTreeWalker {
            engine,
            ignore_non_fatal,
        }
    }

    fn walk_nodes<NV, V>(
        &self,
        path: &mut Vec<u64>,
        visitor: &mut NV,
        krs: &[KeyRange],
        bs: &[u64],
    ) -> anyhow::Result<()>
    where
        NV: NodeVisitor<V>,
        V: Unpack,
    {
        assert_eq!(krs.len(), bs.len());

        // A child that is already on the path means the tree has a loop.
        let mut blocks = Vec::with_capacity(bs.len());
        let mut filtered_krs = Vec::with_capacity(krs.len());
        for (b, kr) in bs.iter().zip(krs) {
            if path.contains(b) {
                let e = context_err(path, &format!("loop detected at block {}", b));
                visitor.damaged(path, kr, &e.keys_context(kr))?;
            } else {
                blocks.push(*b);
                filtered_krs.push(kr.clone());
            }
        }

        match self.engine.read_many(&blocks[..]) {
            Err(_) => {
                // IO completely failed, error every block
                for kr in &filtered_krs {
                    visitor.damaged(path, kr, &io_err(path).keys_context(kr))?;
                }
            }
            Ok(rblocks) => {
                for (rb, kr) in rblocks.into_iter().zip(&filtered_krs) {
                    match rb {
                        Err(_) => visitor.damaged(path, kr, &io_err(path).keys_context(kr))?,
                        Ok(b) => self.walk_node(path, visitor, kr, &b, false)?,
                    }
                }
            }
        }

        Ok(())
    }

    fn walk_node_<NV, V>(
        &self,
        path: &mut Vec<u64>,
        visitor: &mut NV,
        kr: &KeyRange,
        b: &Block,
        is_root: bool,
    ) -> anyhow::Result<()>
    where
        NV: NodeVisitor<V>,
        V: Unpack,
    {
        use Node::*;

        let node = match check_and_unpack_node::<V>(path, b, self.ignore_non_fatal, is_root) {
            Ok(node) => node,
            Err(e) => return visitor.damaged(path, kr, &e.keys_context(kr)),
        };

        match node {
            Internal { keys, values, .. } => match split_key_ranges(path, kr, &keys) {
                Ok(krs) => self.walk_nodes(path, visitor, &krs, &values),
                Err(e) => visitor.damaged(path, kr, &e.keys_context(kr)),
            },
            Leaf {
                header,
                keys,
                values,
            } => visitor.visit(path, kr, &header, &keys, &values),
        }
    }

    fn walk_node<NV, V>(
        &self,
        path: &mut Vec<u64>,
        visitor: &mut NV,
        kr: &KeyRange,
        b: &Block,
        is_root: bool,
    ) -> anyhow::Result<()>
    where
        NV: NodeVisitor<V>,
        V: Unpack,
    {
        path.push(b.loc);
        let r = self.walk_node_(path, visitor, kr, b, is_root);
        path.pop();
        r
    }

    pub fn walk<NV, V>(&self, path: &mut Vec<u64>, visitor: &mut NV, root: u64) -> anyhow::Result<()>
    where
        NV: NodeVisitor<V>,
        V: Unpack,
    {
        let kr = KeyRange::new();
        match self.engine.read(root) {
            Ok(b) => self.walk_node(path, visitor, &kr, &b, true),
            Err(_) => {
                path.push(root);
                let r = visitor.damaged(path, &kr, &io_err(path).keys_context(&kr));
                path.pop();
                r
            }
        }
    }
}

//------------------------------------------

use anyhow::Result;
use std::sync::Arc;

use crate::io_engine::*;
use crate::pdata::btree::*;
use crate::pdata::btree_walker::*;
use crate::thin::block_time::*;
use crate::thin::damage::*;

//------------------------------------------

pub trait MappingVisitor {
    // path holds the thin block the mapping is keyed by
    fn visit(&mut self, path: &[u64], bt: &BlockTime) -> Result<()>;
}

struct MappingNodeVisitor<'a> {
    visitor: &'a mut dyn MappingVisitor,
    damage: &'a mut dyn DamageVisitor,
}

impl<'a> NodeVisitor<BlockTime> for MappingNodeVisitor<'a> {
    fn visit(
        &mut self,
        _path: &[u64],
        _kr: &KeyRange,
        _header: &NodeHeader,
        keys: &[u64],
        values: &[BlockTime],
    ) -> Result<()> {
        for (thin_block, bt) in keys.iter().zip(values) {
            self.visitor.visit(&[*thin_block], bt)?;
        }
        Ok(())
    }

    fn damaged(&mut self, _path: &[u64], kr: &KeyRange, err: &BTreeError) -> Result<()> {
        self.damage.visit(&Damage::MissingMappings {
            keys: kr.clone(),
            desc: err.to_string(),
        })
    }
}

/// Visits every mapping of a single device's mapping tree, in thin block
/// order.
pub fn walk_mapping_tree(
    engine: Arc<dyn IoEngine + Send + Sync>,
    root: u64,
    visitor: &mut dyn MappingVisitor,
    damage: &mut dyn DamageVisitor,
) -> Result<()> {
    let walker = BTreeWalker::new(engine, false);
    let mut v = MappingNodeVisitor { visitor, damage };
    walker.walk(&mut Vec::new(), &mut v, root)
}

//------------------------------------------


//------------------------------------------

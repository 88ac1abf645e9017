use anyhow::Result;
use std::sync::Arc;

use crate::io_engine::*;
use crate::pdata::btree::*;
use crate::pdata::btree_walker::*;
use crate::thin::damage::*;
use crate::thin::device_detail::*;

//------------------------------------------

pub trait DeviceVisitor {
    fn visit(&mut self, dev_id: u64, detail: &DeviceDetail) -> Result<()>;
}

struct DeviceNodeVisitor<'a> {
    visitor: &'a mut dyn DeviceVisitor,
    damage: &'a mut dyn DamageVisitor,
}

impl<'a> NodeVisitor<DeviceDetail> for DeviceNodeVisitor<'a> {
    fn visit(
        &mut self,
        _path: &[u64],
        _kr: &KeyRange,
        _header: &NodeHeader,
        keys: &[u64],
        values: &[DeviceDetail],
    ) -> Result<()> {
        for (dev_id, detail) in keys.iter().zip(values) {
            self.visitor.visit(*dev_id, detail)?;
        }
        Ok(())
    }

    fn damaged(&mut self, _path: &[u64], kr: &KeyRange, err: &BTreeError) -> Result<()> {
        self.damage.visit(&Damage::MissingDevices {
            keys: kr.clone(),
            desc: err.to_string(),
        })
    }
}

/// Visits every device in the details tree in ascending id order.
pub fn walk_device_tree(
    engine: Arc<dyn IoEngine + Send + Sync>,
    root: u64,
    visitor: &mut dyn DeviceVisitor,
    damage: &mut dyn DamageVisitor,
) -> Result<()> {
    let walker = BTreeWalker::new(engine, false);
    let mut v = DeviceNodeVisitor { visitor, damage };
    walker.walk(&mut Vec::new(), &mut v, root)
}

//------------------------------------------


//------------------------------------------

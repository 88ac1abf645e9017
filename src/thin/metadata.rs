use anyhow::{Context, Result};
use std::sync::Arc;

use crate::io_engine::IoEngine;
use crate::pdata::btree_lookup::btree_lookup;
use crate::thin::damage::*;
use crate::thin::device_tree::{self, DeviceVisitor};
use crate::thin::mapping_tree::{self, MappingVisitor};
use crate::thin::superblock::*;

//------------------------------------------

/// Read access to the trees of a pool.  The report only ever goes
/// through this trait, so it can be driven by something other than a
/// real metadata device.
pub trait ThinMetadata {
    fn data_block_size(&self) -> u32;

    /// Every mapping must point below this.
    fn nr_data_blocks(&self) -> u64;

    fn walk_device_tree(
        &self,
        visitor: &mut dyn DeviceVisitor,
        damage: &mut dyn DamageVisitor,
    ) -> Result<()>;

    /// Finds the root of a device's mapping tree in the top level
    /// mapping tree.
    fn lookup_mapping_root(&self, dev_id: u64) -> Result<Option<u64>>;

    fn walk_mapping_tree(
        &self,
        root: u64,
        visitor: &mut dyn MappingVisitor,
        damage: &mut dyn DamageVisitor,
    ) -> Result<()>;
}

//------------------------------------------

pub struct Metadata {
    engine: Arc<dyn IoEngine + Send + Sync>,
    sb: Superblock,
    nr_data_blocks: u64,
}

impl Metadata {
    /// Reads the superblock, or the metadata snapshot's superblock.
    pub fn open(engine: Arc<dyn IoEngine + Send + Sync>, use_metadata_snap: bool) -> Result<Self> {
        let sb = if use_metadata_snap {
            read_superblock_snap(engine.as_ref())?
        } else {
            read_superblock(engine.as_ref(), SUPERBLOCK_LOCATION)?
        };

        let nr_data_blocks = sb.nr_data_blocks()?;
        Ok(Metadata {
            engine,
            sb,
            nr_data_blocks,
        })
    }
}

impl ThinMetadata for Metadata {
    fn data_block_size(&self) -> u32 {
        self.sb.data_block_size
    }

    fn nr_data_blocks(&self) -> u64 {
        self.nr_data_blocks
    }

    fn walk_device_tree(
        &self,
        visitor: &mut dyn DeviceVisitor,
        damage: &mut dyn DamageVisitor,
    ) -> Result<()> {
        device_tree::walk_device_tree(self.engine.clone(), self.sb.details_root, visitor, damage)
    }

    fn lookup_mapping_root(&self, dev_id: u64) -> Result<Option<u64>> {
        btree_lookup::<u64>(self.engine.as_ref(), self.sb.mapping_root, dev_id)
            .with_context(|| format!("couldn't read top level mapping tree for device {}", dev_id))
    }

    fn walk_mapping_tree(
        &self,
        root: u64,
        visitor: &mut dyn MappingVisitor,
        damage: &mut dyn DamageVisitor,
    ) -> Result<()> {
        mapping_tree::walk_mapping_tree(self.engine.clone(), root, visitor, damage)
    }
}

//------------------------------------------

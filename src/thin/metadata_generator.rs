use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::{BTreeMap, BTreeSet};

use crate::io_engine::*;
use crate::pdata::btree_builder::*;
use crate::thin::block_time::*;
use crate::thin::device_detail::*;
use crate::thin::superblock::*;

//------------------------------------------

// Writes small pools for tests: a superblock, a details tree, a top
// level mapping tree and one mapping tree per device.  Space maps are
// not written.

#[derive(Clone, Debug, Default)]
pub struct ThinDevice {
    pub dev_id: u64,
    pub transaction_id: u64,
    pub creation_time: u32,
    pub snapshotted_time: u32,

    /// (thin block, data block) pairs
    pub mappings: Vec<(u64, u64)>,

    /// Reuse another device's mapping tree rather than writing a new one,
    /// the way a fresh snapshot does.
    pub shares_tree_with: Option<u64>,
}

impl ThinDevice {
    /// Maps thin blocks 0, 1, 2, ... to the given data blocks.
    pub fn new(dev_id: u64, data_blocks: &[u64]) -> Self {
        ThinDevice {
            dev_id,
            mappings: data_blocks
                .iter()
                .enumerate()
                .map(|(i, b)| (i as u64, *b))
                .collect(),
            ..Default::default()
        }
    }

    pub fn snapshot(dev_id: u64, origin: &ThinDevice) -> Self {
        ThinDevice {
            dev_id,
            transaction_id: origin.transaction_id,
            creation_time: origin.creation_time + 1,
            snapshotted_time: origin.creation_time + 1,
            mappings: origin.mappings.clone(),
            shares_tree_with: Some(origin.dev_id),
        }
    }

    fn detail(&self) -> DeviceDetail {
        DeviceDetail {
            mapped_blocks: self.mappings.len() as u64,
            transaction_id: self.transaction_id,
            creation_time: self.creation_time,
            snapshotted_time: self.snapshotted_time,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PoolSpec {
    pub data_block_size: u32,
    pub devices: Vec<ThinDevice>,

    /// Devices left out of the top level mapping tree, though they still
    /// appear in the details tree.
    pub unindexed: BTreeSet<u64>,

    /// Size of the data device.  None makes it just big enough for every
    /// mapping.
    pub nr_data_blocks: Option<u64>,
}

impl PoolSpec {
    pub fn new(data_block_size: u32, devices: Vec<ThinDevice>) -> Self {
        PoolSpec {
            data_block_size,
            devices,
            unindexed: BTreeSet::new(),
            nr_data_blocks: None,
        }
    }

    fn nr_data_blocks(&self) -> u64 {
        self.nr_data_blocks.unwrap_or_else(|| {
            self.devices
                .iter()
                .flat_map(|d| d.mappings.iter().map(|(_, data)| data + 1))
                .max()
                .unwrap_or(0)
        })
    }
}

/// Where the trees of a generated pool were written.
#[derive(Clone, Debug, Default)]
pub struct PoolLayout {
    pub superblock: u64,
    pub mapping_root: u64,
    pub details_root: u64,
    pub device_roots: BTreeMap<u64, u64>,
}

//------------------------------------------

fn write_trees(w: &mut NodeWriter, spec: &PoolSpec) -> Result<PoolLayout> {
    let mut devs: Vec<&ThinDevice> = spec.devices.iter().collect();
    devs.sort_by_key(|d| d.dev_id);

    let mut layout = PoolLayout::default();
    for d in devs.iter().filter(|d| d.shares_tree_with.is_none()) {
        let mut mappings = d.mappings.clone();
        mappings.sort_by_key(|(thin, _)| *thin);
        let entries: Vec<(u64, BlockTime)> = mappings
            .iter()
            .map(|(thin, data)| {
                (
                    *thin,
                    BlockTime {
                        block: *data,
                        time: d.creation_time,
                    },
                )
            })
            .collect();
        layout.device_roots.insert(d.dev_id, build_btree(w, &entries)?);
    }

    for d in devs.iter() {
        if let Some(origin) = d.shares_tree_with {
            let root = *layout
                .device_roots
                .get(&origin)
                .ok_or_else(|| anyhow!("device {} shares a tree with unknown device {}", d.dev_id, origin))?;
            layout.device_roots.insert(d.dev_id, root);
        }
    }

    let details: Vec<(u64, DeviceDetail)> = devs.iter().map(|d| (d.dev_id, d.detail())).collect();
    layout.details_root = build_btree(w, &details)?;

    let top: Vec<(u64, u64)> = layout
        .device_roots
        .iter()
        .filter(|(id, _)| !spec.unindexed.contains(id))
        .map(|(id, root)| (*id, *root))
        .collect();
    layout.mapping_root = build_btree(w, &top)?;

    Ok(layout)
}

// Only nr_blocks is filled in, the space maps themselves aren't written.
fn mk_data_sm_root(nr_blocks: u64) -> Vec<u8> {
    let mut root = vec![0; SPACE_MAP_ROOT_SIZE];
    LittleEndian::write_u64(&mut root[0..8], nr_blocks);
    root
}

fn mk_superblock(
    engine: &dyn IoEngine,
    spec: &PoolSpec,
    layout: &PoolLayout,
    metadata_snap: u64,
) -> Superblock {
    Superblock {
        flags: SuperblockFlags { needs_check: false },
        block: layout.superblock,
        version: 2,
        time: spec.devices.iter().map(|d| d.creation_time).max().unwrap_or(0),
        transaction_id: spec.devices.iter().map(|d| d.transaction_id).max().unwrap_or(0),
        metadata_snap,
        data_sm_root: mk_data_sm_root(spec.nr_data_blocks()),
        metadata_sm_root: vec![0; SPACE_MAP_ROOT_SIZE],
        mapping_root: layout.mapping_root,
        details_root: layout.details_root,
        data_block_size: spec.data_block_size,
        nr_metadata_blocks: engine.get_nr_blocks(),
    }
}

/// Writes a pool with no metadata snapshot.
pub fn write_pool(engine: &dyn IoEngine, spec: &PoolSpec) -> Result<PoolLayout> {
    let mut w = NodeWriter::new(engine, SUPERBLOCK_LOCATION + 1);
    let layout = write_trees(&mut w, spec)?;
    write_superblock(engine, &mk_superblock(engine, spec, &layout, 0))?;
    Ok(layout)
}

/// Writes a pool whose live superblock points at a metadata snapshot of
/// another set of trees.  Returns the live layout followed by the
/// snapshot's.
pub fn write_pool_with_snap(
    engine: &dyn IoEngine,
    live: &PoolSpec,
    snap: &PoolSpec,
) -> Result<(PoolLayout, PoolLayout)> {
    let mut w = NodeWriter::new(engine, SUPERBLOCK_LOCATION + 1);

    let snap_sb = w.alloc()?;
    let mut snap_layout = write_trees(&mut w, snap)?;
    snap_layout.superblock = snap_sb;
    write_superblock(engine, &mk_superblock(engine, snap, &snap_layout, 0))?;

    let live_layout = write_trees(&mut w, live)?;
    write_superblock(engine, &mk_superblock(engine, live, &live_layout, snap_sb))?;

    Ok((live_layout, snap_layout))
}

//------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_engine::core::*;
    use crate::pdata::btree_lookup::*;

    #[test]
    fn devices_are_indexed_by_id() {
        let engine = CoreIoEngine::new(64);
        let spec = PoolSpec::new(
            128,
            vec![ThinDevice::new(3, &[7, 8]), ThinDevice::new(1, &[5])],
        );
        let layout = write_pool(&engine, &spec).unwrap();

        for (id, root) in &layout.device_roots {
            assert_eq!(btree_lookup::<u64>(&engine, layout.mapping_root, *id).unwrap(), Some(*root));
        }

        let detail = btree_lookup::<DeviceDetail>(&engine, layout.details_root, 3).unwrap();
        assert_eq!(detail.map(|d| d.mapped_blocks), Some(2));
    }

    #[test]
    fn snapshots_share_the_origin_tree() {
        let engine = CoreIoEngine::new(64);
        let origin = ThinDevice::new(1, &[10, 11, 12]);
        let snap = ThinDevice::snapshot(2, &origin);
        let layout = write_pool(&engine, &PoolSpec::new(128, vec![origin, snap])).unwrap();

        assert_eq!(layout.device_roots[&1], layout.device_roots[&2]);
    }

    #[test]
    fn unindexed_devices_have_no_mapping_root() {
        let engine = CoreIoEngine::new(64);
        let mut spec = PoolSpec::new(
            128,
            vec![ThinDevice::new(1, &[1]), ThinDevice::new(2, &[2])],
        );
        spec.unindexed.insert(2);
        let layout = write_pool(&engine, &spec).unwrap();

        assert!(btree_lookup::<u64>(&engine, layout.mapping_root, 1).unwrap().is_some());
        assert_eq!(btree_lookup::<u64>(&engine, layout.mapping_root, 2).unwrap(), None);
    }

    #[test]
    fn data_device_covers_every_mapping() {
        let engine = CoreIoEngine::new(64);
        let mut spec = PoolSpec::new(
            128,
            vec![ThinDevice::new(1, &[7, 3]), ThinDevice::new(2, &[41])],
        );
        write_pool(&engine, &spec).unwrap();
        let sb = read_superblock(&engine, SUPERBLOCK_LOCATION).unwrap();
        assert_eq!(sb.nr_data_blocks().unwrap(), 42);

        spec.nr_data_blocks = Some(1000);
        write_pool(&engine, &spec).unwrap();
        let sb = read_superblock(&engine, SUPERBLOCK_LOCATION).unwrap();
        assert_eq!(sb.nr_data_blocks().unwrap(), 1000);
    }

    #[test]
    fn duplicate_device_ids_are_rejected() {
        let engine = CoreIoEngine::new(64);
        let spec = PoolSpec::new(
            128,
            vec![ThinDevice::new(1, &[1]), ThinDevice::new(1, &[2])],
        );
        assert!(write_pool(&engine, &spec).is_err());
    }
}

//------------------------------------------

use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian};
use nom::{bytes::complete::*, number::complete::*, IResult};

use crate::checksum::*;
use crate::io_engine::*;

#[cfg(any(test, feature = "devtools"))]
use byteorder::WriteBytesExt;

//----------------------------------------

pub const MAGIC: u64 = 27022010;
pub const SUPERBLOCK_LOCATION: u64 = 0;
const UUID_SIZE: usize = 16;
pub const SPACE_MAP_ROOT_SIZE: usize = 128;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperblockFlags {
    pub needs_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub flags: SuperblockFlags,
    pub block: u64,
    pub version: u32,
    pub time: u32,
    pub transaction_id: u64,
    pub metadata_snap: u64,
    pub data_sm_root: Vec<u8>,
    pub metadata_sm_root: Vec<u8>,
    pub mapping_root: u64,
    pub details_root: u64,
    pub data_block_size: u32,
    pub nr_metadata_blocks: u64,
}

impl Superblock {
    /// Size of the data device in blocks, the first field of the data
    /// space map root.
    pub fn nr_data_blocks(&self) -> Result<u64> {
        match self.data_sm_root.get(0..8) {
            Some(buf) => Ok(LittleEndian::read_u64(buf)),
            None => Err(anyhow!("couldn't unpack data space map root")),
        }
    }
}

fn unpack(data: &[u8]) -> IResult<&[u8], (u64, Superblock)> {
    let (i, _csum) = le_u32(data)?;
    let (i, flags) = le_u32(i)?;
    let (i, block) = le_u64(i)?;
    let (i, _uuid) = take(UUID_SIZE)(i)?;
    let (i, magic) = le_u64(i)?;
    let (i, version) = le_u32(i)?;
    let (i, time) = le_u32(i)?;
    let (i, transaction_id) = le_u64(i)?;
    let (i, metadata_snap) = le_u64(i)?;
    let (i, data_sm_root) = take(SPACE_MAP_ROOT_SIZE)(i)?;
    let (i, metadata_sm_root) = take(SPACE_MAP_ROOT_SIZE)(i)?;
    let (i, mapping_root) = le_u64(i)?;
    let (i, details_root) = le_u64(i)?;
    let (i, data_block_size) = le_u32(i)?;
    let (i, _metadata_block_size) = le_u32(i)?;
    let (i, nr_metadata_blocks) = le_u64(i)?;

    Ok((
        i,
        (
            magic,
            Superblock {
                flags: SuperblockFlags {
                    needs_check: (flags & 0x1) != 0,
                },
                block,
                version,
                time,
                transaction_id,
                metadata_snap,
                data_sm_root: data_sm_root.to_vec(),
                metadata_sm_root: metadata_sm_root.to_vec(),
                mapping_root,
                details_root,
                data_block_size,
                nr_metadata_blocks,
            },
        ),
    ))
}

pub fn read_superblock(engine: &dyn IoEngine, loc: u64) -> Result<Superblock> {
    let b = engine
        .read(loc)
        .map_err(|e| anyhow!("couldn't read superblock at block {}: {}", loc, e))?;

    if metadata_block_type(b.get_data()) != BT::THIN_SUPERBLOCK {
        return Err(anyhow!("bad checksum in superblock"));
    }

    let (magic, sb) = match unpack(b.get_data()) {
        Ok((_, v)) => v,
        Err(_) => return Err(anyhow!("couldn't unpack superblock")),
    };

    if magic != MAGIC {
        return Err(anyhow!("bad magic in superblock"));
    }

    Ok(sb)
}

pub fn read_superblock_snap(engine: &dyn IoEngine) -> Result<Superblock> {
    let actual_sb = read_superblock(engine, SUPERBLOCK_LOCATION)?;
    if actual_sb.metadata_snap == 0 {
        return Err(anyhow!("no current metadata snap"));
    }
    read_superblock(engine, actual_sb.metadata_snap)
}

//------------------------------

#[cfg(any(test, feature = "devtools"))]
fn pack_superblock<W: WriteBytesExt>(sb: &Superblock, w: &mut W) -> Result<()> {
    // checksum, which we don't know yet
    w.write_u32::<LittleEndian>(0)?;

    // flags
    if sb.flags.needs_check {
        w.write_u32::<LittleEndian>(0x1)?;
    } else {
        w.write_u32::<LittleEndian>(0)?;
    }

    w.write_u64::<LittleEndian>(sb.block)?;
    w.write_all(&[0; UUID_SIZE])?;
    w.write_u64::<LittleEndian>(MAGIC)?;
    w.write_u32::<LittleEndian>(sb.version)?;
    w.write_u32::<LittleEndian>(sb.time)?;
    w.write_u64::<LittleEndian>(sb.transaction_id)?;
    w.write_u64::<LittleEndian>(sb.metadata_snap)?;

    // space map roots are opaque here, short ones are zero padded
    for root in [&sb.data_sm_root, &sb.metadata_sm_root] {
        let mut buf = [0u8; SPACE_MAP_ROOT_SIZE];
        let len = root.len().min(SPACE_MAP_ROOT_SIZE);
        buf[..len].copy_from_slice(&root[..len]);
        w.write_all(&buf)?;
    }

    w.write_u64::<LittleEndian>(sb.mapping_root)?;
    w.write_u64::<LittleEndian>(sb.details_root)?;
    w.write_u32::<LittleEndian>(sb.data_block_size)?;
    w.write_u32::<LittleEndian>((BLOCK_SIZE >> SECTOR_SHIFT) as u32)?; // metadata block size
    w.write_u64::<LittleEndian>(sb.nr_metadata_blocks)?;

    Ok(())
}

/// Writes the superblock to the block named in `sb.block`.
#[cfg(any(test, feature = "devtools"))]
pub fn write_superblock(engine: &dyn IoEngine, sb: &Superblock) -> Result<()> {
    let mut b = Block::zeroed(sb.block);

    // pack the superblock
    {
        let mut cursor = std::io::Cursor::new(b.get_data_mut());
        pack_superblock(sb, &mut cursor)?;
    }

    // calculate the checksum
    write_checksum(b.get_data_mut(), BT::THIN_SUPERBLOCK)?;

    // write
    engine.write(&b)?;
    Ok(())
}

//------------------------------


//------------------------------

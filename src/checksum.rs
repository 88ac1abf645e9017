use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian};
use crc32c::crc32c;

use crate::io_engine::BLOCK_SIZE;

//------------------------------------------

const THIN_SUPERBLOCK_CSUM_XOR: u32 = 160774;
const BITMAP_CSUM_XOR: u32 = 240779;
const INDEX_CSUM_XOR: u32 = 160478;
const BTREE_CSUM_XOR: u32 = 121107;

fn checksum(buf: &[u8]) -> u32 {
    crc32c(&buf[4..]) ^ 0xffffffff
}

#[derive(Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[allow(non_camel_case_types)]
pub enum BT {
    THIN_SUPERBLOCK,
    NODE,
    INDEX,
    BITMAP,
    UNKNOWN,
}

/// Identifies a metadata block by the salt its checksum was written with.
pub fn metadata_block_type(buf: &[u8]) -> BT {
    if buf.len() != BLOCK_SIZE {
        return BT::UNKNOWN;
    }

    // The checksum is always the first u32 of the block.
    let sum_on_disk = LittleEndian::read_u32(&buf[0..4]);
    match checksum(buf) ^ sum_on_disk {
        THIN_SUPERBLOCK_CSUM_XOR => BT::THIN_SUPERBLOCK,
        BTREE_CSUM_XOR => BT::NODE,
        BITMAP_CSUM_XOR => BT::BITMAP,
        INDEX_CSUM_XOR => BT::INDEX,
        _ => BT::UNKNOWN,
    }
}

pub fn write_checksum(buf: &mut [u8], kind: BT) -> Result<()> {
    if buf.len() != BLOCK_SIZE {
        return Err(anyhow!("block is wrong size"));
    }

    use BT::*;
    let salt = match kind {
        THIN_SUPERBLOCK => THIN_SUPERBLOCK_CSUM_XOR,
        NODE => BTREE_CSUM_XOR,
        BITMAP => BITMAP_CSUM_XOR,
        INDEX => INDEX_CSUM_XOR,
        UNKNOWN => {
            return Err(anyhow!("Invalid block type"));
        }
    };

    let csum = checksum(buf) ^ salt;
    LittleEndian::write_u32(&mut buf[0..4], csum);
    Ok(())
}

//------------------------------------------


//------------------------------------------

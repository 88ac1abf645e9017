use std::fs::{File, OpenOptions};
use std::io::{self, Result};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::Path;

use crate::io_engine::*;

//------------------------------------------

/// Blocking engine over a regular file or block device.
pub struct SyncIoEngine {
    nr_blocks: u64,
    file: File,
}

impl SyncIoEngine {
    fn open_file(path: &Path, writable: bool, excl: bool) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(writable)
            .custom_flags(if excl { libc::O_EXCL } else { 0 })
            .open(path)
    }

    pub fn new_with<P: AsRef<Path>>(path: P, writable: bool, excl: bool) -> Result<Self> {
        let nr_blocks = get_nr_blocks(path.as_ref())?; // check file mode before opening it
        let file = SyncIoEngine::open_file(path.as_ref(), writable, excl)?;

        Ok(SyncIoEngine { nr_blocks, file })
    }

    fn check_bounds(&self, loc: u64) -> Result<()> {
        if loc >= self.nr_blocks {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {} is beyond the end of the metadata device", loc),
            ));
        }
        Ok(())
    }
}

impl IoEngine for SyncIoEngine {
    fn get_nr_blocks(&self) -> u64 {
        self.nr_blocks
    }

    fn read(&self, loc: u64) -> Result<Block> {
        self.check_bounds(loc)?;
        let mut b = Block::new(loc);
        self.file
            .read_exact_at(b.get_data_mut(), loc * BLOCK_SIZE as u64)?;
        Ok(b)
    }

    fn read_many(&self, blocks: &[u64]) -> Result<Vec<Result<Block>>> {
        Ok(blocks.iter().map(|loc| self.read(*loc)).collect())
    }

    fn write(&self, b: &Block) -> Result<()> {
        self.check_bounds(b.loc)?;
        self.file
            .write_all_at(b.get_data(), b.loc * BLOCK_SIZE as u64)
    }
}

//------------------------------------------


//------------------------------------------

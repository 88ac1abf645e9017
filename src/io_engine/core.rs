use std::io;
use std::sync::Mutex;

use crate::io_engine::{Block, IoEngine, BLOCK_SIZE};

//------------------------------------------

/// An engine backed by memory, used to build and read pools in tests.
pub struct CoreIoEngine {
    nr_blocks: u64,
    data: Mutex<Vec<u8>>,
}

impl CoreIoEngine {
    pub fn new(nr_blocks: u64) -> CoreIoEngine {
        CoreIoEngine {
            nr_blocks,
            data: Mutex::new(vec![0; BLOCK_SIZE * nr_blocks as usize]),
        }
    }

    fn range(&self, b: u64) -> io::Result<std::ops::Range<usize>> {
        if b >= self.nr_blocks {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        let begin = b as usize * BLOCK_SIZE;
        Ok(begin..begin + BLOCK_SIZE)
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Vec<u8>>> {
        self.data
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "core engine lock poisoned"))
    }
}

impl IoEngine for CoreIoEngine {
    fn get_nr_blocks(&self) -> u64 {
        self.nr_blocks
    }

    fn read(&self, b: u64) -> io::Result<Block> {
        let range = self.range(b)?;
        let mut block = Block::new(b);
        block.get_data_mut().copy_from_slice(&self.lock()?[range]);
        Ok(block)
    }

    fn read_many(&self, blocks: &[u64]) -> io::Result<Vec<io::Result<Block>>> {
        Ok(blocks.iter().map(|b| self.read(*b)).collect())
    }

    fn write(&self, block: &Block) -> io::Result<()> {
        let range = self.range(block.loc)?;
        self.lock()?[range].copy_from_slice(block.get_data());
        Ok(())
    }
}

//------------------------------------------

/// Overwrites a block with zeroes, which invalidates its checksum.
pub fn trash_block(engine: &dyn IoEngine, b: u64) -> io::Result<()> {
    engine.write(&Block::zeroed(b))
}

//------------------------------------------

use safemem::write_bytes;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::io::{self, Result};
use std::path::Path;

use crate::file_utils;

//------------------------------------------

pub const BLOCK_SIZE: usize = 4096;
pub const SECTOR_SHIFT: usize = 9;
const ALIGN: usize = 4096;

fn block_layout() -> Layout {
    // BLOCK_SIZE and ALIGN are non-zero powers of two.
    unsafe { Layout::from_size_align_unchecked(BLOCK_SIZE, ALIGN) }
}

/// A single aligned metadata block together with its location.
#[derive(Debug)]
pub struct Block {
    pub loc: u64,
    data: *mut u8,
}

impl Block {
    // The memory is not initialised.
    pub fn new(loc: u64) -> Self {
        let layout = block_layout();
        let data = unsafe { alloc(layout) };
        if data.is_null() {
            handle_alloc_error(layout);
        }
        Block { loc, data }
    }

    pub fn zeroed(loc: u64) -> Self {
        let mut b = Self::new(loc);
        write_bytes(b.get_data_mut(), 0);
        b
    }

    pub fn get_data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data, BLOCK_SIZE) }
    }

    pub fn get_data_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.data, BLOCK_SIZE) }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.data, block_layout());
        }
    }
}

unsafe impl Send for Block {}

//------------------------------------------

pub trait IoEngine {
    fn get_nr_blocks(&self) -> u64;

    fn read(&self, b: u64) -> Result<Block>;
    // The whole io could fail, or individual blocks
    fn read_many(&self, blocks: &[u64]) -> Result<Vec<Result<Block>>>;

    fn write(&self, block: &Block) -> Result<()>;
}

pub fn get_nr_blocks(path: &Path) -> io::Result<u64> {
    Ok(file_utils::file_size(path)? / (BLOCK_SIZE as u64))
}

//------------------------------------------

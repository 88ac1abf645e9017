use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thinls::file_utils;

use crate::common::test_dir::TestDir;

//------------------------------------------

pub fn mk_zeroed_md(td: &mut TestDir) -> Result<PathBuf> {
    let md = td.mk_path("meta.bin");
    file_utils::create_sized_file(&md, 1024 * 1024 * 4)?;
    Ok(md)
}

pub fn mk_sized_file(td: &mut TestDir, nr_bytes: u64) -> Result<PathBuf> {
    let md = td.mk_path("meta.bin");
    file_utils::create_sized_file(&md, nr_bytes)?;
    Ok(md)
}

pub fn damage_superblock(path: &Path) -> Result<()> {
    let mut output = OpenOptions::new().read(false).write(true).open(path)?;
    let buf = [0u8; 512];
    output.write_all(&buf)?;
    Ok(())
}

// Compares the file before and after the thunk is run to ensure it is
// unchanged.
pub fn ensure_untouched<F>(p: &Path, thunk: F) -> Result<()>
where
    F: Fn() -> Result<()>,
{
    let before = std::fs::read(p)?;
    thunk()?;
    assert!(before == std::fs::read(p)?);
    Ok(())
}

//------------------------------------------

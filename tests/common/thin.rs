use anyhow::Result;
use std::path::{Path, PathBuf};

use thinls::io_engine::*;
use thinls::thin::metadata_generator::*;

use crate::common::fixture::*;
use crate::common::test_dir::TestDir;

//------------------------------------------

pub fn thin_ls_path() -> &'static str {
    env!("CARGO_BIN_EXE_thin_ls")
}

pub fn pdata_tools_path() -> &'static str {
    env!("CARGO_BIN_EXE_pdata_tools")
}

fn open_for_write(md: &Path) -> Result<SyncIoEngine> {
    Ok(SyncIoEngine::new_with(md, true, false)?)
}

pub fn mk_pool(td: &mut TestDir, spec: &PoolSpec) -> Result<(PathBuf, PoolLayout)> {
    let md = mk_zeroed_md(td)?;
    let layout = write_pool(&open_for_write(&md)?, spec)?;
    Ok((md, layout))
}

pub fn mk_pool_with_snap(
    td: &mut TestDir,
    live: &PoolSpec,
    snap: &PoolSpec,
) -> Result<(PathBuf, PoolLayout)> {
    let md = mk_zeroed_md(td)?;
    let (layout, _) = write_pool_with_snap(&open_for_write(&md)?, live, snap)?;
    Ok((md, layout))
}

// Two devices that share blocks 2 and 3.
pub fn mk_shared_pool(td: &mut TestDir) -> Result<(PathBuf, PoolLayout)> {
    let mut a = ThinDevice::new(1, &[1, 2, 3]);
    a.transaction_id = 4;
    a.creation_time = 1;
    let mut b = ThinDevice::new(2, &[2, 3, 4]);
    b.transaction_id = 5;
    b.creation_time = 2;
    b.snapshotted_time = 3;
    mk_pool(td, &PoolSpec::new(128, vec![a, b]))
}

pub fn trash_metadata_block(md: &Path, b: u64) -> Result<()> {
    let engine = open_for_write(md)?;
    engine.write(&Block::zeroed(b))?;
    Ok(())
}

//------------------------------------------

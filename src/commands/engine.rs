use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::Path;
use std::sync::Arc;

use crate::io_engine::*;

//------------------------------------------

pub struct EngineOptions {
    pub exclusive: bool,
    pub use_metadata_snap: bool,
}

fn metadata_snap_flag(matches: &ArgMatches) -> bool {
    // Tools without the flag never use metadata snaps.
    matches
        .try_get_one::<bool>("METADATA_SNAPSHOT")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

pub fn parse_engine_opts(matches: &ArgMatches) -> EngineOptions {
    let use_metadata_snap = metadata_snap_flag(matches);

    // only the snapshot may be read while the pool is live
    EngineOptions {
        exclusive: !use_metadata_snap,
        use_metadata_snap,
    }
}

//------------------------------------------

pub fn build_io_engine<P: AsRef<Path>>(
    path: P,
    opts: &EngineOptions,
) -> Result<Arc<dyn IoEngine + Send + Sync>> {
    let path = path.as_ref();
    let engine = SyncIoEngine::new_with(path, false, opts.exclusive)
        .with_context(|| format!("couldn't open metadata device '{}'", path.display()))?;
    Ok(Arc::new(engine))
}

//------------------------------------------

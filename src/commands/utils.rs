use anyhow::Result;
use atty::Stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::file_utils;
use crate::io_engine::BLOCK_SIZE;
use crate::report::*;
use crate::thin::ls::LsError;

//------------------------------------------

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Couldn't find input file '{}'.", .0.display())]
    NotFound(PathBuf),

    #[error("Not a block device or regular file '{}'.", .0.display())]
    NotFileOrBlk(PathBuf),

    #[error("Couldn't get the size of '{}': {}", .0.display(), .1)]
    Size(PathBuf, std::io::Error),

    #[error("Metadata device/file too small.  Is this binary metadata?")]
    TooSmall,
}

pub fn check_input_file(input_file: &Path) -> Result<&Path> {
    if !file_utils::file_exists(input_file) {
        return Err(InputError::NotFound(input_file.to_path_buf()).into());
    }

    if file_utils::is_file_or_blk(input_file).is_err() {
        return Err(InputError::NotFileOrBlk(input_file.to_path_buf()).into());
    }

    Ok(input_file)
}

pub fn check_file_not_tiny(input_file: &Path) -> Result<&Path> {
    let size = file_utils::file_size(input_file)
        .map_err(|e| InputError::Size(input_file.to_path_buf(), e))?;
    if size < BLOCK_SIZE as u64 {
        return Err(InputError::TooSmall.into());
    }
    Ok(input_file)
}

//------------------------------------------

pub fn mk_report(quiet: bool) -> Arc<Report> {
    if quiet {
        Arc::new(mk_quiet_report())
    } else if atty::is(Stream::Stdout) {
        Arc::new(mk_progress_bar_report())
    } else {
        Arc::new(mk_simple_report())
    }
}

fn error_code(e: &anyhow::Error) -> exitcode::ExitCode {
    if e.downcast_ref::<InputError>().is_some() {
        return exitcode::USAGE;
    }

    match e.downcast_ref::<LsError>() {
        Some(LsError::UnknownField(_)) | Some(LsError::MissingInput) => exitcode::USAGE,
        Some(LsError::MetadataDamage) | Some(LsError::MissingMappingRoot(_)) => exitcode::DATAERR,
        None => exitcode::IOERR,
    }
}

pub fn to_exit_code<T>(report: &Arc<Report>, result: Result<T>) -> exitcode::ExitCode {
    match result {
        Ok(_) => exitcode::OK,
        Err(e) => {
            report.fatal(&format!("{}", e));
            error_code(&e)
        }
    }
}

//------------------------------------------


//------------------------------------------

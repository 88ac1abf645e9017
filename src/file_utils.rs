use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

//------------------------------------------

// _IOR(0x12, 114, size_t)
#[cfg(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc",
    target_arch = "sparc64"
))]
const BLKGETSIZE64: libc::c_ulong = 0x40081272;

#[cfg(not(any(
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "sparc",
    target_arch = "sparc64"
)))]
const BLKGETSIZE64: libc::c_ulong = 0x80081272;

//------------------------------------------

pub fn file_exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Fails unless the path names a regular file or a block device.
pub fn is_file_or_blk(path: &Path) -> io::Result<()> {
    let info = fs::metadata(path)?;
    let ft = info.file_type();
    if ft.is_file() || ft.is_block_device() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Not a block device or regular file",
        ))
    }
}

fn get_device_size(file: &File) -> io::Result<u64> {
    let mut size: u64 = 0;
    let r = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) };
    if r == 0 {
        Ok(size)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Size in bytes of a regular file or block device.
pub fn file_size(path: &Path) -> io::Result<u64> {
    let info = fs::metadata(path)?;
    if info.file_type().is_block_device() {
        let file = OpenOptions::new().read(true).open(path)?;
        get_device_size(&file)
    } else {
        Ok(info.len())
    }
}

pub fn create_sized_file(path: &Path, nr_bytes: u64) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(nr_bytes)?;
    Ok(file)
}

//------------------------------------------

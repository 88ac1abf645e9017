extern crate anyhow;
extern crate byteorder;
extern crate crc32c;
extern crate nom;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod checksum;
pub mod commands;
pub mod file_utils;
pub mod grid_layout;
pub mod io_engine;
pub mod pdata;
pub mod report;
pub mod thin;
pub mod units;
pub mod version;

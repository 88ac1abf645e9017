// not every test binary uses every helper
#![allow(dead_code)]

pub mod fixture;
pub mod process;
pub mod test_dir;
pub mod thin;

pub mod block_time;
pub mod damage;
pub mod device_detail;
pub mod device_tree;
pub mod ls;
pub mod mapping_tree;
pub mod metadata;
pub mod ref_tracker;
pub mod superblock;

#[cfg(any(test, feature = "devtools"))]
pub mod metadata_generator;

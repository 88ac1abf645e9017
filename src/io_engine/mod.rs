pub mod base;
pub mod core;
pub mod sync;

pub use crate::io_engine::base::*;
pub use crate::io_engine::sync::SyncIoEngine;

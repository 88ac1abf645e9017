use anyhow::Result;
use std::fmt;

use crate::pdata::btree::KeyRange;
use crate::thin::ls::LsError;

//------------------------------------------

/// Structural damage found while walking the metadata.  The key ranges
/// say which part of the tree couldn't be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Damage {
    MissingDevices { keys: KeyRange, desc: String },
    MissingMappings { keys: KeyRange, desc: String },
}

impl fmt::Display for Damage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Damage::MissingDevices { keys, desc } => {
                write!(f, "missing devices {}: {}", keys, desc)
            }
            Damage::MissingMappings { keys, desc } => {
                write!(f, "missing mappings {}: {}", keys, desc)
            }
        }
    }
}

/// Decides what a walk does when it meets damage.  Returning an error
/// aborts the walk.
pub trait DamageVisitor {
    fn visit(&mut self, d: &Damage) -> Result<()>;
}

/// Any damage at all aborts the report.
pub struct FatalDamage;

impl DamageVisitor for FatalDamage {
    fn visit(&mut self, _d: &Damage) -> Result<()> {
        Err(LsError::MetadataDamage.into())
    }
}

//------------------------------------------

use byteorder::WriteBytesExt;
use nom::{number::complete::*, IResult};
use std::fmt;
use std::io;

use crate::pdata::unpack::*;

//------------------------------------------

/// A leaf value of a mapping tree: the data block a thin block maps to,
/// and the time it was written.  Packed into a single u64 on disk, with
/// the low 24 bits holding the time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockTime {
    pub block: u64,
    pub time: u32,
}

const TIME_BITS: u32 = 24;

impl Unpack for BlockTime {
    fn disk_size() -> u32 {
        8
    }

    fn unpack(i: &[u8]) -> IResult<&[u8], BlockTime> {
        let (i, n) = le_u64(i)?;
        let block = n >> TIME_BITS;
        let time = n & ((1 << TIME_BITS) - 1);

        Ok((
            i,
            BlockTime {
                block,
                time: time as u32,
            },
        ))
    }
}

impl Pack for BlockTime {
    fn pack<W: WriteBytesExt>(&self, data: &mut W) -> io::Result<()> {
        let bt: u64 = (self.block << TIME_BITS) | (self.time as u64 & ((1 << TIME_BITS) - 1));
        bt.pack(data)
    }
}

impl fmt::Display for BlockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.block, self.time)
    }
}

//------------------------------------------


//------------------------------------------

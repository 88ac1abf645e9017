use fixedbitset::FixedBitSet;

//------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    Unmapped,
    Exclusive,
    Shared,
}

const INITIAL_NR_BLOCKS: usize = 5120;

/// Records, for every data block seen, whether one or more devices map
/// it.  Each block takes two bits: a `seen` bit at 2b and a `shared` bit
/// at 2b + 1.
pub struct ReferenceTracker {
    bits: FixedBitSet,
}

impl Default for ReferenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceTracker {
    pub fn new() -> Self {
        ReferenceTracker {
            bits: FixedBitSet::with_capacity(INITIAL_NR_BLOCKS * 2),
        }
    }

    /// Number of block addresses currently covered.
    pub fn capacity(&self) -> u64 {
        (self.bits.len() / 2) as u64
    }

    fn ensure_covers(&mut self, b: u64) {
        let needed = b as usize + 1;
        let mut nr_blocks = self.bits.len() / 2;
        if nr_blocks >= needed {
            return;
        }

        while nr_blocks < needed {
            nr_blocks *= 2;
        }
        self.bits.grow(nr_blocks * 2);
    }

    pub fn increment(&mut self, b: u64) {
        self.ensure_covers(b);

        let seen = b as usize * 2;
        if self.bits.contains(seen) {
            self.bits.insert(seen + 1);
        } else {
            self.bits.insert(seen);
        }
    }

    /// Never grows the tracker, blocks beyond the capacity are unmapped.
    pub fn get_state(&self, b: u64) -> BlockState {
        let seen = b as usize * 2;
        match (self.bits.contains(seen), self.bits.contains(seen + 1)) {
            (false, _) => BlockState::Unmapped,
            (true, false) => BlockState::Exclusive,
            (true, true) => BlockState::Shared,
        }
    }
}

//------------------------------------------


//------------------------------------------

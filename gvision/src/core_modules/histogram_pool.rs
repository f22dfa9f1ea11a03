// THEORY:
// The scratch pool is a small fixed arena of pre-allocated histograms that the
// equalizer cycles through round robin, one slot per frame. Handing out slots
// by index (instead of reusing one buffer) means the histogram of frame `n`
// stays intact and readable, e.g. by a plotting sink, while frame `n + 1` is
// being computed into the next slot. The number of slots is independent of the
// worker count.

use crate::core_modules::histogram::Histogram;
use crate::error::{Error, Result};

pub const DEFAULT_HISTOGRAM_SLOTS: usize = 8;

/// Index of a leased slot in a [`HistogramPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct HistogramPool {
    slots: Vec<Histogram>,
    position: usize,
}

impl HistogramPool {
    pub fn new(slot_count: usize) -> Result<Self> {
        if slot_count == 0 {
            return Err(Error::InvalidArgument(
                "histogram pool needs at least one slot".into(),
            ));
        }
        Ok(Self {
            slots: vec![Histogram::new(); slot_count],
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Leases the next slot round robin and zero-fills it.
    pub fn lease(&mut self) -> SlotId {
        let id = SlotId(self.position);
        self.position = (self.position + 1) % self.slots.len();
        self.slots[id.0].clear();
        id
    }

    pub fn get(&self, id: SlotId) -> &Histogram {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut Histogram {
        &mut self.slots[id.0]
    }
}

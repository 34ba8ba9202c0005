//! Sorting along the last axis via odd-even transposition ("brick
//! sort"), specification §4.11.

use gctx::error::fatal;
use ngrid_shaders::Kernel;

use crate::exec;
use crate::grid::NGrid;

impl NGrid {
    /// Sorts each row (every element along the last axis, independently
    /// per combination of the leading axes) ascending, or descending when
    /// `descending` is set. One dispatch per phase, alternating even/odd
    /// pairs, for `row_len` phases total — guarantees full sortedness
    /// (Batcher's odd-even transposition sort).
    pub fn sorted(&self, descending: bool) -> NGrid {
        if self.rank() == 0 {
            fatal("sorted: cannot sort a shapeless grid");
        }
        let row_len = *self.shape().dims().last().unwrap();
        let rows = (self.len() as u32) / row_len.max(1);
        let result = self.clone();
        if row_len <= 1 {
            return result;
        }

        let pairs = row_len / 2 + row_len % 2;
        for phase_index in 0..row_len {
            let phase = (phase_index % 2) as u32;
            let mut push = Vec::with_capacity(16);
            push.extend_from_slice(&row_len.to_le_bytes());
            push.extend_from_slice(&rows.to_le_bytes());
            push.extend_from_slice(&phase.to_le_bytes());
            push.extend_from_slice(&(descending as u32).to_le_bytes());
            exec::dispatch_2d(Kernel::SortBrick, pairs, rows, &[result.data_buf()], &push);
        }
        result
    }

    /// Ascending sort, the common case.
    pub fn sort(&self) -> NGrid {
        self.sorted(false)
    }

    /// Descending sort.
    pub fn sort_descending(&self) -> NGrid {
        self.sorted(true)
    }
}

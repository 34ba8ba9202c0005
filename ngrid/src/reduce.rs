//! Whole-grid reductions: min/max/maxabs/sum/product/mean and the
//! variance family, plus median (specification §4.11).

use gctx::error::fatal;
use gctx::SharedContext;
use ngrid_shaders::Kernel;

use crate::exec;
use crate::grid::{alloc_data_buffer, NGrid};

const LOCAL_SUM: u32 = 0;
const LOCAL_PRODUCT: u32 = 1;
const LOCAL_MIN: u32 = 2;
const LOCAL_MAX: u32 = 3;
const LOCAL_MAXABS: u32 = 4;
const LOCAL_SUMSQ: u32 = 5;

const GLOBAL_MEAN: u32 = 6;

/// Whether a variance-family statistic divides by `n` (population) or
/// `n - 1` (sample, Bessel's correction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divisor {
    Population,
    Sample,
}

impl Divisor {
    fn n(self, count: u32) -> u32 {
        match self {
            Divisor::Population => count,
            Divisor::Sample => count.saturating_sub(1).max(1),
        }
    }
}

fn reduce_full(grid: &NGrid, local_op: u32, global_op: u32, divisor: u32) -> f32 {
    if grid.len() == 0 {
        fatal("reduce over an empty grid is undefined");
    }
    let n = grid.len() as u32;
    let wg = SharedContext::get().config.default_workgroup_size_1d;
    let workgroup_count = (n + wg - 1) / wg.max(1);

    let partials = alloc_data_buffer(workgroup_count as usize);
    let mut push_local = Vec::with_capacity(8);
    push_local.extend_from_slice(&n.to_le_bytes());
    push_local.extend_from_slice(&local_op.to_le_bytes());
    exec::dispatch_1d(Kernel::ReduceLocal, n, &[grid.data_buf(), partials.raw_handle()], &push_local);

    let result_buf = alloc_data_buffer(1);
    let mut push_global = Vec::with_capacity(16);
    push_global.extend_from_slice(&workgroup_count.to_le_bytes());
    push_global.extend_from_slice(&global_op.to_le_bytes());
    push_global.extend_from_slice(&0u32.to_le_bytes());
    push_global.extend_from_slice(&divisor.to_le_bytes());
    exec::dispatch_1d(
        Kernel::ReduceGlobal,
        1,
        &[partials.raw_handle(), result_buf.raw_handle()],
        &push_global,
    );

    result_buf.get(0)
}

impl NGrid {
    pub fn sum(&self) -> f32 {
        reduce_full(self, LOCAL_SUM, LOCAL_SUM, 1)
    }

    pub fn product(&self) -> f32 {
        reduce_full(self, LOCAL_PRODUCT, LOCAL_PRODUCT, 1)
    }

    pub fn min_value(&self) -> f32 {
        reduce_full(self, LOCAL_MIN, LOCAL_MIN, 1)
    }

    pub fn max_value(&self) -> f32 {
        reduce_full(self, LOCAL_MAX, LOCAL_MAX, 1)
    }

    pub fn max_abs(&self) -> f32 {
        reduce_full(self, LOCAL_MAXABS, LOCAL_MAXABS, 1)
    }

    pub fn mean(&self) -> f32 {
        reduce_full(self, LOCAL_SUM, GLOBAL_MEAN, self.len() as u32)
    }

    /// `E[x²] - E[x]²` (population) or its Bessel-corrected sample form.
    pub fn variance(&self, divisor: Divisor) -> f32 {
        let n = self.len() as u32;
        let mean = self.mean();
        let sum_sq = reduce_full(self, LOCAL_SUMSQ, LOCAL_SUM, 1);
        match divisor {
            Divisor::Population => sum_sq / n as f32 - mean * mean,
            Divisor::Sample => (sum_sq - n as f32 * mean * mean) / divisor.n(n) as f32,
        }
    }

    pub fn stdev(&self, divisor: Divisor) -> f32 {
        self.variance(divisor).sqrt()
    }

    /// Third standardized moment (Fisher-Pearson skewness), always
    /// computed against the population standard deviation.
    pub fn skew(&self) -> f32 {
        let mean = self.mean();
        let std_dev = self.stdev(Divisor::Population);
        if std_dev == 0.0 {
            return 0.0;
        }
        let centered = self.sub_scalar(mean);
        let cubed = centered.pow_scalar(3.0);
        let m3 = cubed.mean();
        m3 / std_dev.powi(3)
    }

    /// Excess kurtosis (fourth standardized moment minus 3, so a normal
    /// distribution reads ~0).
    pub fn kurtosis(&self) -> f32 {
        let mean = self.mean();
        let variance = self.variance(Divisor::Population);
        if variance == 0.0 {
            return 0.0;
        }
        let centered = self.sub_scalar(mean);
        let fourth = centered.pow_scalar(4.0);
        let m4 = fourth.mean();
        m4 / (variance * variance) - 3.0
    }

    /// Median of a flattened copy: sorts ascending and reads the middle
    /// element (averaging the two central elements for an even count).
    pub fn median(&self) -> f32 {
        if self.len() == 0 {
            fatal("median of an empty grid is undefined");
        }
        let flat = self.flatten();
        let sorted = flat.sort();
        let n = sorted.len();
        if n % 2 == 1 {
            sorted.get(n / 2)
        } else {
            (sorted.get(n / 2 - 1) + sorted.get(n / 2)) / 2.0
        }
    }
}

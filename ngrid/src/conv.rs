//! 2-D convolution and pooling over `[height, width]` or `[height, width,
//! channels]` grids (specification §4.11).

use gctx::error::fatal;
use ngrid_shaders::Kernel;

use crate::exec;
use crate::grid::NGrid;
use crate::shape::Shape;

const POOL_MAX: u32 = 0;
const POOL_MEAN: u32 = 1;

/// Pooling reduction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Max,
    Mean,
}

impl PoolKind {
    fn code(self) -> u32 {
        match self {
            PoolKind::Max => POOL_MAX,
            PoolKind::Mean => POOL_MEAN,
        }
    }
}

/// Accepts a rank-2 `[height, width]` image (implicit single channel) or a
/// rank-3 `[height, width, channels]` image. Returns the spatial extent,
/// channel count, and whether the channel axis was implicit (so callers can
/// drop it again from their output shape).
fn require_image(grid: &NGrid) -> (u32, u32, u32, bool) {
    let dims = grid.shape().dims();
    match grid.rank() {
        2 => (dims[0], dims[1], 1, true),
        3 => (dims[0], dims[1], dims[2], false),
        rank => fatal(format!("expected a rank-2 or rank-3 image grid, got rank {rank}")),
    }
}

impl NGrid {
    /// 2-D convolution against a single `[kernel_h, kernel_w]` kernel,
    /// applied independently per channel, zero-padded at the border.
    /// Output shape equals the input shape (§9's convolution-sizing open
    /// question, resolved in favor of same-size output).
    pub fn convolve(&self, kernel: &NGrid) -> NGrid {
        let (height, width, channels, _implicit_channel) = require_image(self);
        if kernel.rank() != 2 {
            fatal(format!("convolution kernel must be rank 2, got rank {}", kernel.rank()));
        }
        let kernel_dims = kernel.shape().dims();
        let (kernel_h, kernel_w) = (kernel_dims[0], kernel_dims[1]);

        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(20);
        push.extend_from_slice(&height.to_le_bytes());
        push.extend_from_slice(&width.to_le_bytes());
        push.extend_from_slice(&channels.to_le_bytes());
        push.extend_from_slice(&kernel_h.to_le_bytes());
        push.extend_from_slice(&kernel_w.to_le_bytes());

        exec::dispatch_3d(
            Kernel::Convolution,
            width,
            height,
            channels,
            &[self.data_buf(), kernel.data_buf(), result.data_buf()],
            &push,
        );
        result
    }

    /// Pools over a `window_h × window_w` sliding window with the given
    /// stride, no padding. `out = floor((in - window) / stride) + 1`
    /// along each spatial axis.
    pub fn pool(&self, kind: PoolKind, window: (u32, u32), stride: (u32, u32)) -> NGrid {
        let (in_height, in_width, channels, implicit_channel) = require_image(self);
        let (window_h, window_w) = window;
        let (stride_h, stride_w) = stride;
        if window_h == 0 || window_w == 0 || stride_h == 0 || stride_w == 0 {
            fatal("pool: window and stride must be positive");
        }
        if window_h > in_height || window_w > in_width {
            fatal("pool: window larger than the input's spatial extent");
        }

        let out_height = (in_height - window_h) / stride_h + 1;
        let out_width = (in_width - window_w) / stride_w + 1;
        let out_dims = if implicit_channel {
            vec![out_height, out_width]
        } else {
            vec![out_height, out_width, channels]
        };
        let result = NGrid::new(Shape::new(out_dims));

        let mut push = Vec::with_capacity(40);
        push.extend_from_slice(&in_height.to_le_bytes());
        push.extend_from_slice(&in_width.to_le_bytes());
        push.extend_from_slice(&channels.to_le_bytes());
        push.extend_from_slice(&out_height.to_le_bytes());
        push.extend_from_slice(&out_width.to_le_bytes());
        push.extend_from_slice(&window_h.to_le_bytes());
        push.extend_from_slice(&window_w.to_le_bytes());
        push.extend_from_slice(&stride_h.to_le_bytes());
        push.extend_from_slice(&stride_w.to_le_bytes());
        push.extend_from_slice(&kind.code().to_le_bytes());

        exec::dispatch_3d(Kernel::Pool, out_width, out_height, channels, &[self.data_buf(), result.data_buf()], &push);
        result
    }
}

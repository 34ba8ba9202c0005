//! Compiled compute-shader catalog for `ngrid`.
//!
//! Every kernel used by the tensor engine (specification §4.7, §4.9-4.11)
//! is compiled from GLSL to SPIR-V at build time by `build.rs` and
//! embedded in the binary, so the final crate needs no runtime shader
//! compiler or filesystem access to dispatch a kernel.

mod fallback;

include!(concat!(env!("OUT_DIR"), "/shader_catalog.rs"));

/// Every kernel the engine can dispatch, one per `.comp` source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    ElementwiseBinary,
    ElementwiseScalar,
    ElementwiseUnary,
    Trig,
    Comparison,
    Activation,
    Fill,
    RandomFill,
    ReduceLocal,
    ReduceGlobal,
    Matmul,
    Hadamard,
    Transpose,
    Concatenate,
    Padding,
    Mirror,
    Subgrid,
    Convolution,
    Pool,
    SortBrick,
    LuPivot,
    LuSwap,
    LuLcol,
    LuUtrail,
    TriInvLower,
    TriInvUpper,
}

impl Kernel {
    /// Returns the kernel's SPIR-V words, ready to hand to
    /// `gpu_context::ShaderModule::new`.
    pub fn spirv(self) -> &'static [u32] {
        match self {
            Kernel::ElementwiseBinary => ELEMENTWISE_BINARY_COMP_SPV,
            Kernel::ElementwiseScalar => ELEMENTWISE_SCALAR_COMP_SPV,
            Kernel::ElementwiseUnary => ELEMENTWISE_UNARY_COMP_SPV,
            Kernel::Trig => TRIG_COMP_SPV,
            Kernel::Comparison => COMPARISON_COMP_SPV,
            Kernel::Activation => ACTIVATION_COMP_SPV,
            Kernel::Fill => FILL_COMP_SPV,
            Kernel::RandomFill => RANDOM_FILL_COMP_SPV,
            Kernel::ReduceLocal => REDUCE_LOCAL_COMP_SPV,
            Kernel::ReduceGlobal => REDUCE_GLOBAL_COMP_SPV,
            Kernel::Matmul => MATMUL_COMP_SPV,
            Kernel::Hadamard => HADAMARD_COMP_SPV,
            Kernel::Transpose => TRANSPOSE_COMP_SPV,
            Kernel::Concatenate => CONCATENATE_COMP_SPV,
            Kernel::Padding => PADDING_COMP_SPV,
            Kernel::Mirror => MIRROR_COMP_SPV,
            Kernel::Subgrid => SUBGRID_COMP_SPV,
            Kernel::Convolution => CONVOLUTION_COMP_SPV,
            Kernel::Pool => POOL_COMP_SPV,
            Kernel::SortBrick => SORT_BRICK_COMP_SPV,
            Kernel::LuPivot => LU_PIVOT_COMP_SPV,
            Kernel::LuSwap => LU_SWAP_COMP_SPV,
            Kernel::LuLcol => LU_LCOL_COMP_SPV,
            Kernel::LuUtrail => LU_UTRAIL_COMP_SPV,
            Kernel::TriInvLower => TRI_INV_LOWER_COMP_SPV,
            Kernel::TriInvUpper => TRI_INV_UPPER_COMP_SPV,
        }
    }

    /// Returns the kernel's SPIR-V as raw bytes, ready for
    /// `gpu_context::ShaderModule::new`.
    pub fn spirv_bytes(self) -> &'static [u8] {
        let words = self.spirv();
        unsafe { std::slice::from_raw_parts(words.as_ptr() as *const u8, words.len() * 4) }
    }

    /// The entry point name used by every kernel in this catalog.
    pub const fn entry_point(self) -> &'static str {
        "main"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kernel_has_nonempty_spirv() {
        let all = [
            Kernel::ElementwiseBinary,
            Kernel::ElementwiseScalar,
            Kernel::ElementwiseUnary,
            Kernel::Trig,
            Kernel::Comparison,
            Kernel::Activation,
            Kernel::Fill,
            Kernel::RandomFill,
            Kernel::ReduceLocal,
            Kernel::ReduceGlobal,
            Kernel::Matmul,
            Kernel::Hadamard,
            Kernel::Transpose,
            Kernel::Concatenate,
            Kernel::Padding,
            Kernel::Mirror,
            Kernel::Subgrid,
            Kernel::Convolution,
            Kernel::Pool,
            Kernel::SortBrick,
            Kernel::LuPivot,
            Kernel::LuSwap,
            Kernel::LuLcol,
            Kernel::LuUtrail,
            Kernel::TriInvLower,
            Kernel::TriInvUpper,
        ];
        for kernel in all {
            assert!(!kernel.spirv().is_empty(), "{kernel:?} has no SPIR-V words");
        }
    }
}

//! Arithmetic, trig, comparison, and fill operations on [`NGrid`]
//! (specification §4.9, §4.10).

use ngrid_shaders::Kernel;

use crate::exec;
use crate::grid::NGrid;
use crate::shape::Shape;

const OP_ADD: u32 = 0;
const OP_SUB: u32 = 1;
const OP_MUL: u32 = 2;
const OP_DIV: u32 = 3;
const OP_MOD: u32 = 4;
const OP_MIN: u32 = 5;
const OP_MAX: u32 = 6;
const OP_POW: u32 = 7;

const SCALAR_GT: u32 = 6;
const SCALAR_LT: u32 = 7;
const SCALAR_EQ: u32 = 8;
const SCALAR_NE: u32 = 9;
const SCALAR_GE: u32 = 10;
const SCALAR_LE: u32 = 11;

const UNARY_NEG: u32 = 0;
const UNARY_ABS: u32 = 1;
const UNARY_SIGN: u32 = 2;
const UNARY_SQRT: u32 = 3;
const UNARY_EXP: u32 = 4;
const UNARY_LOG: u32 = 5;
const UNARY_ROUND: u32 = 6;
const UNARY_FLOOR: u32 = 7;
const UNARY_CEIL: u32 = 8;
const UNARY_RECIP: u32 = 9;
const UNARY_SQUARE: u32 = 10;
const UNARY_NOT: u32 = 11;

const TRIG_SIN: u32 = 0;
const TRIG_COS: u32 = 1;
const TRIG_TAN: u32 = 2;
const TRIG_ASIN: u32 = 3;
const TRIG_ACOS: u32 = 4;
const TRIG_ATAN: u32 = 5;
const TRIG_SINH: u32 = 6;
const TRIG_COSH: u32 = 7;
const TRIG_TANH: u32 = 8;
const TRIG_ASINH: u32 = 9;
const TRIG_ACOSH: u32 = 10;
const TRIG_ATANH: u32 = 11;

/// Angle unit for the plain/inverse circular trig functions, per the
/// §4.9 unit-tagged trig catalog. Each variant carries the number of
/// units in one full turn, used to scale to/from radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    Degrees,
    /// 12-hour clock face: one turn is 12 units.
    Hours12,
    /// 24-hour clock face: one turn is 24 units.
    Hours24,
    Gradians,
    /// One turn is 100 units.
    Percent,
    /// One turn is 1 unit.
    NormalCircle,
}

impl AngleUnit {
    fn code(self) -> u32 {
        match self {
            AngleUnit::Radians => 0,
            AngleUnit::Degrees => 1,
            AngleUnit::Hours12 => 2,
            AngleUnit::Hours24 => 3,
            AngleUnit::Gradians => 4,
            AngleUnit::Percent => 5,
            AngleUnit::NormalCircle => 6,
        }
    }
}

const CMP_GT: u32 = 0;
const CMP_LT: u32 = 1;
const CMP_EQ: u32 = 2;
const CMP_NE: u32 = 3;
const CMP_GE: u32 = 4;
const CMP_LE: u32 = 5;
const CMP_AND: u32 = 6;
const CMP_OR: u32 = 7;

const FILL_ZERO: u32 = 0;
const FILL_CONST: u32 = 1;
const FILL_RANGE: u32 = 2;
const FILL_INDEX: u32 = 3;
const FILL_IDENTITY: u32 = 4;

const RAND_BINARY: u32 = 0;
const RAND_SIGN: u32 = 1;
const RAND_UNIFORM: u32 = 2;
const RAND_UNIFORM_INT: u32 = 3;
const RAND_GAUSSIAN: u32 = 4;
const RAND_SCALED_GAUSSIAN: u32 = 5;

impl NGrid {
    fn binary_dispatch(&self, other: &NGrid, op: u32) -> NGrid {
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(16);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());
        push.extend_from_slice(&(other.rank() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        exec::dispatch_1d(
            Kernel::ElementwiseBinary,
            self.len() as u32,
            &[
                self.data_buf(),
                self.shape_buf_raw(),
                other.data_buf(),
                other.shape_buf_raw(),
                result.data_buf(),
            ],
            &push,
        );
        result
    }

    fn scalar_dispatch(&self, scalar: f32, op: u32) -> NGrid {
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(12);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&scalar.to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        exec::dispatch_1d(
            Kernel::ElementwiseScalar,
            self.len() as u32,
            &[self.data_buf(), self.shape_buf_raw(), result.data_buf()],
            &push,
        );
        result
    }

    fn unary_dispatch(&self, op: u32) -> NGrid {
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        exec::dispatch_1d(Kernel::ElementwiseUnary, self.len() as u32, &[self.data_buf(), result.data_buf()], &push);
        result
    }

    fn trig_dispatch(&self, op: u32, input_unit: AngleUnit, output_unit: AngleUnit) -> NGrid {
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(16);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        push.extend_from_slice(&input_unit.code().to_le_bytes());
        push.extend_from_slice(&output_unit.code().to_le_bytes());
        exec::dispatch_1d(Kernel::Trig, self.len() as u32, &[self.data_buf(), result.data_buf()], &push);
        result
    }

    fn comparison_dispatch(&self, other: &NGrid, op: u32) -> NGrid {
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let mut push = Vec::with_capacity(16);
        push.extend_from_slice(&(self.len() as u32).to_le_bytes());
        push.extend_from_slice(&(self.rank() as u32).to_le_bytes());
        push.extend_from_slice(&(other.rank() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        exec::dispatch_1d(
            Kernel::Comparison,
            self.len() as u32,
            &[
                self.data_buf(),
                self.shape_buf_raw(),
                other.data_buf(),
                other.shape_buf_raw(),
                result.data_buf(),
            ],
            &push,
        );
        result
    }

    pub fn add(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_ADD)
    }
    pub fn sub(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_SUB)
    }
    pub fn mul(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_MUL)
    }
    pub fn div(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_DIV)
    }
    pub fn modulo(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_MOD)
    }
    pub fn min(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_MIN)
    }
    pub fn max(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_MAX)
    }
    pub fn pow(&self, other: &NGrid) -> NGrid {
        self.binary_dispatch(other, OP_POW)
    }

    pub fn add_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_ADD)
    }
    pub fn sub_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_SUB)
    }
    pub fn mul_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_MUL)
    }
    pub fn div_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_DIV)
    }
    pub fn mod_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_MOD)
    }
    pub fn pow_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, OP_POW)
    }
    pub fn gt_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_GT)
    }
    pub fn lt_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_LT)
    }
    pub fn eq_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_EQ)
    }
    pub fn ne_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_NE)
    }
    pub fn ge_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_GE)
    }
    pub fn le_scalar(&self, s: f32) -> NGrid {
        self.scalar_dispatch(s, SCALAR_LE)
    }

    pub fn neg(&self) -> NGrid {
        self.unary_dispatch(UNARY_NEG)
    }
    pub fn abs(&self) -> NGrid {
        self.unary_dispatch(UNARY_ABS)
    }
    pub fn sign(&self) -> NGrid {
        self.unary_dispatch(UNARY_SIGN)
    }
    pub fn sqrt(&self) -> NGrid {
        self.unary_dispatch(UNARY_SQRT)
    }
    pub fn exp(&self) -> NGrid {
        self.unary_dispatch(UNARY_EXP)
    }
    pub fn log(&self) -> NGrid {
        self.unary_dispatch(UNARY_LOG)
    }
    pub fn round(&self) -> NGrid {
        self.unary_dispatch(UNARY_ROUND)
    }
    pub fn floor(&self) -> NGrid {
        self.unary_dispatch(UNARY_FLOOR)
    }
    pub fn ceil(&self) -> NGrid {
        self.unary_dispatch(UNARY_CEIL)
    }
    pub fn recip(&self) -> NGrid {
        self.unary_dispatch(UNARY_RECIP)
    }
    pub fn square(&self) -> NGrid {
        self.unary_dispatch(UNARY_SQUARE)
    }
    pub fn not(&self) -> NGrid {
        self.unary_dispatch(UNARY_NOT)
    }

    pub fn sin(&self, input_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_SIN, input_unit, AngleUnit::Radians)
    }
    pub fn cos(&self, input_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_COS, input_unit, AngleUnit::Radians)
    }
    pub fn tan(&self, input_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_TAN, input_unit, AngleUnit::Radians)
    }
    pub fn asin(&self, output_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_ASIN, AngleUnit::Radians, output_unit)
    }
    pub fn acos(&self, output_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_ACOS, AngleUnit::Radians, output_unit)
    }
    pub fn atan(&self, output_unit: AngleUnit) -> NGrid {
        self.trig_dispatch(TRIG_ATAN, AngleUnit::Radians, output_unit)
    }
    pub fn sinh(&self) -> NGrid {
        self.trig_dispatch(TRIG_SINH, AngleUnit::Radians, AngleUnit::Radians)
    }
    pub fn cosh(&self) -> NGrid {
        self.trig_dispatch(TRIG_COSH, AngleUnit::Radians, AngleUnit::Radians)
    }
    pub fn tanh(&self) -> NGrid {
        self.trig_dispatch(TRIG_TANH, AngleUnit::Radians, AngleUnit::Radians)
    }
    pub fn asinh(&self) -> NGrid {
        self.trig_dispatch(TRIG_ASINH, AngleUnit::Radians, AngleUnit::Radians)
    }
    pub fn acosh(&self) -> NGrid {
        self.trig_dispatch(TRIG_ACOSH, AngleUnit::Radians, AngleUnit::Radians)
    }
    pub fn atanh(&self) -> NGrid {
        self.trig_dispatch(TRIG_ATANH, AngleUnit::Radians, AngleUnit::Radians)
    }

    pub fn gt(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_GT)
    }
    pub fn lt(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_LT)
    }
    pub fn eq_elementwise(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_EQ)
    }
    pub fn ne_elementwise(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_NE)
    }
    pub fn ge(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_GE)
    }
    pub fn le(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_LE)
    }
    pub fn logical_and(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_AND)
    }
    pub fn logical_or(&self, other: &NGrid) -> NGrid {
        self.comparison_dispatch(other, CMP_OR)
    }

    fn fill_dispatch(shape: Shape, op: u32, value: f32, start: f32, step: f32) -> NGrid {
        let grid = NGrid::new(shape);
        if grid.len() == 0 {
            return grid;
        }
        let mut push = Vec::with_capacity(24);
        push.extend_from_slice(&(grid.len() as u32).to_le_bytes());
        push.extend_from_slice(&(grid.rank() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        push.extend_from_slice(&value.to_le_bytes());
        push.extend_from_slice(&start.to_le_bytes());
        push.extend_from_slice(&step.to_le_bytes());
        exec::dispatch_1d(Kernel::Fill, grid.len() as u32, &[grid.shape_buf_raw(), grid.data_buf()], &push);
        grid
    }

    /// Allocates a grid of `shape` with every element zero. Equivalent to
    /// [`NGrid::new`], spelled out for symmetry with the rest of the fill
    /// family.
    pub fn zeros(shape: impl Into<Shape>) -> NGrid {
        Self::fill_dispatch(shape.into(), FILL_ZERO, 0.0, 0.0, 0.0)
    }

    pub fn filled(shape: impl Into<Shape>, value: f32) -> NGrid {
        Self::fill_dispatch(shape.into(), FILL_CONST, value, 0.0, 0.0)
    }

    /// `result[flat] = start + step * flat`.
    pub fn range(shape: impl Into<Shape>, start: f32, step: f32) -> NGrid {
        Self::fill_dispatch(shape.into(), FILL_RANGE, 0.0, start, step)
    }

    /// `result[flat] = flat`.
    pub fn indices(shape: impl Into<Shape>) -> NGrid {
        Self::fill_dispatch(shape.into(), FILL_INDEX, 0.0, 0.0, 0.0)
    }

    /// 1 on the leading diagonal (every coordinate equal), 0 elsewhere;
    /// exact on square grids (every axis the same size), per §4.9.
    pub fn identity(shape: impl Into<Shape>) -> NGrid {
        Self::fill_dispatch(shape.into(), FILL_IDENTITY, 0.0, 0.0, 0.0)
    }

    fn random_dispatch(shape: Shape, op: u32, seed: u32, lo: f32, hi: f32, scale: f32) -> NGrid {
        let grid = NGrid::new(shape);
        if grid.len() == 0 {
            return grid;
        }
        let mut push = Vec::with_capacity(24);
        push.extend_from_slice(&(grid.len() as u32).to_le_bytes());
        push.extend_from_slice(&op.to_le_bytes());
        push.extend_from_slice(&seed.to_le_bytes());
        push.extend_from_slice(&lo.to_le_bytes());
        push.extend_from_slice(&hi.to_le_bytes());
        push.extend_from_slice(&scale.to_le_bytes());
        exec::dispatch_1d(Kernel::RandomFill, grid.len() as u32, &[grid.data_buf()], &push);
        grid
    }

    /// Bernoulli(0.5) over `{0, 1}`.
    pub fn random_binary(shape: impl Into<Shape>, seed: u32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_BINARY, seed, 0.0, 0.0, 0.0)
    }

    /// Uniform over `{-1, 1}`.
    pub fn random_sign(shape: impl Into<Shape>, seed: u32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_SIGN, seed, 0.0, 0.0, 0.0)
    }

    pub fn random_uniform(shape: impl Into<Shape>, seed: u32, lo: f32, hi: f32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_UNIFORM, seed, lo, hi, 0.0)
    }

    /// Uniform integer (stored as whole-numbered floats) over `[lo, hi)`.
    pub fn random_uniform_int(shape: impl Into<Shape>, seed: u32, lo: f32, hi: f32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_UNIFORM_INT, seed, lo, hi, 0.0)
    }

    /// Standard normal via Box-Muller.
    pub fn random_gaussian(shape: impl Into<Shape>, seed: u32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_GAUSSIAN, seed, 0.0, 0.0, 1.0)
    }

    /// Normal scaled by `scale`, the building block for the
    /// initialization schemes in [`crate::activation`].
    pub fn random_scaled_gaussian(shape: impl Into<Shape>, seed: u32, scale: f32) -> NGrid {
        Self::random_dispatch(shape.into(), RAND_SCALED_GAUSSIAN, seed, 0.0, 0.0, scale)
    }

    /// Inverted-dropout mask: `1/keep_prob` with probability `keep_prob`,
    /// else 0, so that `x.mul(&NGrid::dropout_mask(...))` keeps the
    /// expected activation magnitude unchanged (the ambient "fill_dropout"
    /// surface named in SPEC_FULL's supplemented-features section).
    pub fn dropout_mask(shape: impl Into<Shape>, seed: u32, keep_prob: f32) -> NGrid {
        let shape = shape.into();
        let mask = NGrid::random_uniform(shape.clone(), seed, 0.0, 1.0);
        let kept = mask.lt_scalar(keep_prob); // 1.0 where kept
        kept.mul_scalar(1.0 / keep_prob.max(1e-12))
    }
}

//! Neural-network activation functions and their matching weight
//! initialization schemes (specification §4.9's activation catalog).

use ngrid_shaders::Kernel;

use crate::exec;
use crate::grid::NGrid;
use crate::shape::Shape;

const ACT_IDENTITY: u32 = 0;
const ACT_SIGMOID: u32 = 1;
const ACT_RELU: u32 = 2;
const ACT_LEAKY_RELU: u32 = 3;
const ACT_ELU: u32 = 4;
const ACT_LEAKY_ELU: u32 = 5;
const ACT_TANH: u32 = 6;

/// A unit activation function, parameterized by its leak/alpha slope
/// where applicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Identity,
    Sigmoid,
    ReLU,
    LeakyReLU { alpha: f32 },
    ELU { alpha: f32 },
    LeakyELU { alpha: f32 },
    Tanh,
}

impl Activation {
    fn kind(self) -> u32 {
        match self {
            Activation::Identity => ACT_IDENTITY,
            Activation::Sigmoid => ACT_SIGMOID,
            Activation::ReLU => ACT_RELU,
            Activation::LeakyReLU { .. } => ACT_LEAKY_RELU,
            Activation::ELU { .. } => ACT_ELU,
            Activation::LeakyELU { .. } => ACT_LEAKY_ELU,
            Activation::Tanh => ACT_TANH,
        }
    }

    fn alpha(self) -> f32 {
        match self {
            Activation::LeakyReLU { alpha } | Activation::ELU { alpha } | Activation::LeakyELU { alpha } => alpha,
            _ => 0.0,
        }
    }

    fn dispatch(self, grid: &NGrid, derivative: bool) -> NGrid {
        if grid.len() == 0 {
            return NGrid::new(grid.shape().clone());
        }
        let result = NGrid::new(grid.shape().clone());
        let mut push = Vec::with_capacity(16);
        push.extend_from_slice(&(grid.len() as u32).to_le_bytes());
        push.extend_from_slice(&self.kind().to_le_bytes());
        push.extend_from_slice(&(derivative as u32).to_le_bytes());
        push.extend_from_slice(&self.alpha().to_le_bytes());
        exec::dispatch_1d(Kernel::Activation, grid.len() as u32, &[grid.data_buf(), result.data_buf()], &push);
        result
    }

    pub fn apply(self, grid: &NGrid) -> NGrid {
        self.dispatch(grid, false)
    }

    pub fn derivative(self, grid: &NGrid) -> NGrid {
        self.dispatch(grid, true)
    }
}

/// NN-initialization random fills, each a scaled draw from
/// [`NGrid::random_scaled_gaussian`] or [`NGrid::random_uniform`] with a
/// standard deviation (or bound) derived from fan-in/fan-out, matching
/// the initialization schemes conventionally paired with each
/// activation.
impl NGrid {
    /// Glorot/Xavier normal: `N(0, sqrt(2 / (fan_in + fan_out)))`, paired
    /// with [`Activation::Tanh`].
    pub fn init_tanh_normal(shape: impl Into<Shape>, seed: u32, fan_in: u32, fan_out: u32) -> NGrid {
        let std_dev = (2.0 / (fan_in + fan_out).max(1) as f32).sqrt();
        NGrid::random_scaled_gaussian(shape, seed, std_dev)
    }

    /// Glorot/Xavier uniform: `U(-b, b)` with `b = sqrt(6 / (fan_in +
    /// fan_out))`, paired with [`Activation::Tanh`].
    pub fn init_tanh_uniform(shape: impl Into<Shape>, seed: u32, fan_in: u32, fan_out: u32) -> NGrid {
        let bound = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
        NGrid::random_uniform(shape, seed, -bound, bound)
    }

    /// A Xavier-normal draw scaled by 4, the conventional adjustment for
    /// [`Activation::Sigmoid`]'s shallower gradient near the origin.
    pub fn init_sigmoid_scaled(shape: impl Into<Shape>, seed: u32, fan_in: u32, fan_out: u32) -> NGrid {
        let std_dev = 4.0 * (2.0 / (fan_in + fan_out).max(1) as f32).sqrt();
        NGrid::random_scaled_gaussian(shape, seed, std_dev)
    }

    /// He normal: `N(0, sqrt(2 / fan_in))`, paired with
    /// [`Activation::ReLU`]/[`Activation::LeakyReLU`].
    pub fn init_relu_he(shape: impl Into<Shape>, seed: u32, fan_in: u32) -> NGrid {
        let std_dev = (2.0 / fan_in.max(1) as f32).sqrt();
        NGrid::random_scaled_gaussian(shape, seed, std_dev)
    }

    /// He normal, paired with [`Activation::ELU`]/[`Activation::LeakyELU`]
    /// (same fan-in-only scaling as ReLU-He; ELU's negative branch keeps
    /// the same variance target).
    pub fn init_elu_he(shape: impl Into<Shape>, seed: u32, fan_in: u32) -> NGrid {
        Self::init_relu_he(shape, seed, fan_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_only_applies_to_leaky_variants() {
        assert_eq!(Activation::ReLU.alpha(), 0.0);
        assert_eq!(Activation::LeakyReLU { alpha: 0.1 }.alpha(), 0.1);
        assert_eq!(Activation::ELU { alpha: 0.2 }.alpha(), 0.2);
    }

    #[test]
    fn kind_codes_match_the_shader_catalog() {
        assert_eq!(Activation::Identity.kind(), ACT_IDENTITY);
        assert_eq!(Activation::Sigmoid.kind(), ACT_SIGMOID);
        assert_eq!(Activation::Tanh.kind(), ACT_TANH);
    }
}

/*! An n-dimensional GPU tensor engine built on [`gctx`] (the context
 *  layer: instances, devices, typed buffers, descriptor sets, pipelines).
 *
 *  [`NGrid`] is the sole value type; every arithmetic, reduction, linear
 *  algebra, convolution, and sorting operation is a method on it that
 *  funnels through [`exec::dispatch`] to run a cataloged compute kernel
 *  from [`ngrid_shaders`].
 */

pub mod activation;
pub mod conv;
pub mod error;
pub mod exec;
pub mod grid;
pub mod linalg;
pub mod random;
pub mod reduce;
pub mod shape;
pub mod sort;

mod elementwise;

pub use activation::Activation;
pub use elementwise::AngleUnit;
pub use error::GridError;
pub use grid::NGrid;
pub use shape::Shape;

//! Scalar type alias for the simulation.
//!
//! Body and joint state is stored in `f32` so that it packs directly into
//! the flattened compute buffers. The eigensolver promotes to `f64`
//! internally.

/// The floating-point type used for simulation state.
pub type Scalar = f32;

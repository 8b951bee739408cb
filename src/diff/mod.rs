//! Differentiable operations (backward passes).
//!
//! Per-point gradients for every forward operation in `core`; the batched
//! versions live behind `backend`.

pub mod covariance_grad;
pub mod math_grad;
pub mod project_grad;
pub mod sh_grad;

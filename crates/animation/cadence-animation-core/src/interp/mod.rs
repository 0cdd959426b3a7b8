//! Interpolation kinds and the pure evaluator.
//!
//! Step holds the left key, Linear blends component-wise in the float domain,
//! Bezier solves the key tangents' time curve for the curve parameter before
//! evaluating the value curve.

pub mod functions;

use serde::{Deserialize, Serialize};

pub use functions::{
    bezier_value, linear_value, solve_bezier_parameter, step_value, CubicBezier,
    BEZIER_MAX_ITERATIONS, BEZIER_TIME_EPSILON,
};

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InterpolationType {
    #[default]
    Step,
    Linear,
    /// Requires a spline with tangent keys
    Bezier,
}

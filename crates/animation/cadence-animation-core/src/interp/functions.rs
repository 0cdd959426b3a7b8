//! Interpolation helpers:
//! - step_value (hold left until the segment completes)
//! - linear_value (component-wise lerp in the float domain)
//! - bezier_value (tangent control points, bisection on the time curve)

use crate::spline::{SplineKey, Tangents};
use crate::value::{Components, Value};

/// Accepted distance, in spline time units, between the solved time curve
/// and the target time.
pub const BEZIER_TIME_EPSILON: f32 = 1.0;

/// Upper bound on bisection steps; guarantees termination on degenerate
/// tangents (non-monotonic or zero-width time curves).
pub const BEZIER_MAX_ITERATIONS: u32 = 32;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Step interpolation: left value until the segment fraction reaches 1.
#[inline]
pub fn step_value(a: &Value, b: &Value, fraction: f32) -> Value {
    if fraction < 1.0 {
        *a
    } else {
        *b
    }
}

/// Linear interpolation across value kinds. Booleans degrade to a switch at
/// the 0.5 fraction through the float-domain round trip.
pub fn linear_value(a: &Value, b: &Value, t: f32) -> Value {
    if a.kind() != b.kind() {
        // Fallback: if types mismatch, prefer left (fail-soft).
        return *a;
    }
    let ca = a.to_components();
    let cb = b.to_components();
    let mut out = ca;
    for (o, (va, vb)) in out
        .as_mut_slice()
        .iter_mut()
        .zip(ca.as_slice().iter().zip(cb.as_slice()))
    {
        *o = lerp_f32(*va, *vb, t);
    }
    Value::from_components(a.kind(), out.as_slice())
}

/// Cubic curve in power basis, expanded from four Bernstein control points:
/// `B(u) = a*u^3 + b*u^2 + c*u + d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
}

impl CubicBezier {
    pub fn from_control_points(p0: f32, p1: f32, p2: f32, p3: f32) -> Self {
        Self {
            a: p3 - 3.0 * p2 + 3.0 * p1 - p0,
            b: 3.0 * p2 - 6.0 * p1 + 3.0 * p0,
            c: 3.0 * p1 - 3.0 * p0,
            d: p0,
        }
    }

    #[inline]
    pub fn eval(&self, u: f32) -> f32 {
        ((self.a * u + self.b) * u + self.c) * u + self.d
    }
}

/// Find `u` in [0,1] with `curve(u)` within [`BEZIER_TIME_EPSILON`] of
/// `target` by interval halving. Assumes a non-decreasing time curve; on other
/// curves it still stops after [`BEZIER_MAX_ITERATIONS`] steps.
pub fn solve_bezier_parameter(curve: &CubicBezier, target: f32) -> f32 {
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut u = 0.5f32;
    for _ in 0..BEZIER_MAX_ITERATIONS {
        u = 0.5 * (lo + hi);
        let err = curve.eval(u) - target;
        if err.abs() < BEZIER_TIME_EPSILON {
            break;
        }
        if err < 0.0 {
            lo = u;
        } else {
            hi = u;
        }
    }
    u
}

/// Bezier evaluation between two keys at absolute spline time `target`.
///
/// Keys are 2D control points (time on x, value on y): P0 = (t0, v0),
/// P1 = P0 + out-tangent of the left key, P2 = P3 + in-tangent of the right
/// key, P3 = (t1, v1). Vector values use one value curve per component with
/// the shared tangent y offset. Missing tangents read as flat.
pub fn bezier_value(
    left: &SplineKey,
    t0: f32,
    right: &SplineKey,
    t1: f32,
    target: f32,
) -> Value {
    if left.value.kind() != right.value.kind() {
        return left.value;
    }
    let tl = left.tangents.unwrap_or(Tangents::FLAT);
    let tr = right.tangents.unwrap_or(Tangents::FLAT);

    let time_curve =
        CubicBezier::from_control_points(t0, t0 + tl.r#out.x, t1 + tr.r#in.x, t1);
    let u = solve_bezier_parameter(&time_curve, target);

    let ca = left.value.to_components();
    let cb = right.value.to_components();
    let mut out: Components = ca;
    for (o, (va, vb)) in out
        .as_mut_slice()
        .iter_mut()
        .zip(ca.as_slice().iter().zip(cb.as_slice()))
    {
        let curve =
            CubicBezier::from_control_points(*va, *va + tl.r#out.y, *vb + tr.r#in.y, *vb);
        *o = curve.eval(u);
    }
    Value::from_components(left.value.kind(), out.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::Vec2;
    use crate::value::ValueKind;

    #[test]
    fn step_switches_only_at_segment_end() {
        let a = Value::Int32(1);
        let b = Value::Int32(2);
        assert_eq!(step_value(&a, &b, 0.0), a);
        assert_eq!(step_value(&a, &b, 0.999), a);
        assert_eq!(step_value(&a, &b, 1.0), b);
    }

    #[test]
    fn linear_vectors_and_ints() {
        assert_eq!(
            linear_value(&Value::Vec2f([0.0, 10.0]), &Value::Vec2f([10.0, 20.0]), 0.25),
            Value::Vec2f([2.5, 12.5])
        );
        assert_eq!(
            linear_value(&Value::Int32(0), &Value::Int32(3), 0.5),
            Value::Int32(2)
        );
        assert_eq!(
            linear_value(&Value::Vec3i([0, 0, 0]), &Value::Vec3i([-3, 3, 1]), 0.5),
            Value::Vec3i([-2, 2, 1])
        );
    }

    #[test]
    fn linear_bool_is_threshold_switch() {
        let f = Value::Bool(false);
        let t = Value::Bool(true);
        assert_eq!(linear_value(&f, &t, 0.5), f);
        assert_eq!(linear_value(&f, &t, 0.6), t);
        assert_eq!(linear_value(&t, &f, 0.4), t);
    }

    #[test]
    fn cubic_expansion_hits_endpoints() {
        let c = CubicBezier::from_control_points(2.0, 5.0, -1.0, 7.0);
        assert_eq!(c.eval(0.0), 2.0);
        assert!((c.eval(1.0) - 7.0).abs() < 1e-5);
        // Bernstein form at u = 0.5: (p0 + 3p1 + 3p2 + p3) / 8
        let expected = (2.0 + 15.0 - 3.0 + 7.0) / 8.0;
        assert!((c.eval(0.5) - expected).abs() < 1e-5);
    }

    #[test]
    fn solver_terminates_on_degenerate_curve() {
        let flat = CubicBezier::from_control_points(5.0, 5.0, 5.0, 5.0);
        let u = solve_bezier_parameter(&flat, 100.0);
        assert!((0.0..=1.0).contains(&u));
    }

    #[test]
    fn bezier_flat_tangents_symmetric_midpoint() {
        let a = SplineKey::with_tangents(Value::Float(0.0), Vec2::ZERO, Vec2::ZERO);
        let b = SplineKey::with_tangents(Value::Float(10.0), Vec2::ZERO, Vec2::ZERO);
        let v = bezier_value(&a, 0.0, &b, 10.0, 5.0);
        assert_eq!(v, Value::Float(5.0));
    }

    #[test]
    fn bezier_time_solving_is_non_uniform() {
        // Strong out-tangent in time pulls the curve parameter back, so the
        // value at a quarter of the segment differs from the linear value.
        let a = SplineKey::with_tangents(Value::Float(0.0), Vec2::ZERO, Vec2::new(800.0, 0.0));
        let b = SplineKey::with_tangents(Value::Float(100.0), Vec2::ZERO, Vec2::ZERO);
        let v = bezier_value(&a, 0.0, &b, 1000.0, 250.0);
        let Value::Float(f) = v else { panic!("expected float") };
        assert!(f < 25.0, "got {f}");
        assert!(f >= 0.0);
    }

    #[test]
    fn bezier_vector_per_component() {
        let a = SplineKey::with_tangents(Value::Vec2f([0.0, 100.0]), Vec2::ZERO, Vec2::ZERO);
        let b = SplineKey::with_tangents(Value::Vec2f([10.0, 0.0]), Vec2::ZERO, Vec2::ZERO);
        let v = bezier_value(&a, 0.0, &b, 100.0, 50.0);
        assert_eq!(v.kind(), ValueKind::Vec2f);
        assert_eq!(v, Value::Vec2f([5.0, 50.0]));
    }
}

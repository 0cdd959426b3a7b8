//! Animatable value kinds.
//!
//! Splines, bindings and the evaluator share this closed set of kinds.
//! Arithmetic blending always goes through the float-domain representation
//! returned by [`Value::to_components`]; integer kinds round back half away
//! from zero and booleans switch at 0.5.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    Vec2f,
    Vec3f,
    Vec4f,
    Vec2i,
    Vec3i,
    Vec4i,
}

impl ValueKind {
    /// Number of scalar components.
    #[inline]
    pub fn component_count(self) -> usize {
        match self {
            ValueKind::Bool
            | ValueKind::Int32
            | ValueKind::Int64
            | ValueKind::Float
            | ValueKind::Double => 1,
            ValueKind::Vec2f | ValueKind::Vec2i => 2,
            ValueKind::Vec3f | ValueKind::Vec3i => 3,
            ValueKind::Vec4f | ValueKind::Vec4i => 4,
        }
    }

    /// Kind of a single extracted component.
    #[inline]
    pub fn component_kind(self) -> ValueKind {
        match self {
            ValueKind::Vec2f | ValueKind::Vec3f | ValueKind::Vec4f => ValueKind::Float,
            ValueKind::Vec2i | ValueKind::Vec3i | ValueKind::Vec4i => ValueKind::Int32,
            scalar => scalar,
        }
    }

    #[inline]
    pub fn is_vector(self) -> bool {
        self.component_count() > 1
    }
}

/// Which part of a spline value an instance feeds to its bindings.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VectorComponent {
    #[default]
    All,
    X,
    Y,
    Z,
    W,
}

impl VectorComponent {
    #[inline]
    pub fn axis(self) -> Option<usize> {
        match self {
            VectorComponent::All => None,
            VectorComponent::X => Some(0),
            VectorComponent::Y => Some(1),
            VectorComponent::Z => Some(2),
            VectorComponent::W => Some(3),
        }
    }
}

/// Binding/spline type compatibility.
///
/// With `All` the binding must take the full spline value kind. With a single
/// axis selected, the axis must exist on the spline kind and the binding must
/// take that kind's component type.
pub fn is_binding_compatible(
    spline_kind: ValueKind,
    component: VectorComponent,
    binding_kind: ValueKind,
) -> bool {
    match component.axis() {
        None => spline_kind == binding_kind,
        Some(axis) => {
            axis < spline_kind.component_count() && spline_kind.component_kind() == binding_kind
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Step-like boolean; blends through a 0.5 threshold
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    /// Interpolated in single precision
    Double(f64),
    Vec2f([f32; 2]),
    Vec3f([f32; 3]),
    Vec4f([f32; 4]),
    Vec2i([i32; 2]),
    Vec3i([i32; 3]),
    Vec4i([i32; 4]),
}

/// Float-domain view of a value: up to four components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Components {
    len: usize,
    data: [f32; 4],
}

impl Components {
    pub fn from_slice(values: &[f32]) -> Self {
        let mut data = [0.0; 4];
        let len = values.len().min(4);
        data[..len].copy_from_slice(&values[..len]);
        Self { len, data }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[inline]
fn round_to_i32(v: f32) -> i32 {
    // f32::round rounds half away from zero
    v.round() as i32
}

#[inline]
fn round_to_i64(v: f32) -> i64 {
    v.round() as i64
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Vec2f(_) => ValueKind::Vec2f,
            Value::Vec3f(_) => ValueKind::Vec3f,
            Value::Vec4f(_) => ValueKind::Vec4f,
            Value::Vec2i(_) => ValueKind::Vec2i,
            Value::Vec3i(_) => ValueKind::Vec3i,
            Value::Vec4i(_) => ValueKind::Vec4i,
        }
    }

    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int32 => Value::Int32(0),
            ValueKind::Int64 => Value::Int64(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::Vec2f => Value::Vec2f([0.0; 2]),
            ValueKind::Vec3f => Value::Vec3f([0.0; 3]),
            ValueKind::Vec4f => Value::Vec4f([0.0; 4]),
            ValueKind::Vec2i => Value::Vec2i([0; 2]),
            ValueKind::Vec3i => Value::Vec3i([0; 3]),
            ValueKind::Vec4i => Value::Vec4i([0; 4]),
        }
    }

    pub fn to_components(&self) -> Components {
        match self {
            Value::Bool(b) => Components::from_slice(&[if *b { 1.0 } else { 0.0 }]),
            Value::Int32(v) => Components::from_slice(&[*v as f32]),
            Value::Int64(v) => Components::from_slice(&[*v as f32]),
            Value::Float(v) => Components::from_slice(&[*v]),
            Value::Double(v) => Components::from_slice(&[*v as f32]),
            Value::Vec2f(v) => Components::from_slice(v),
            Value::Vec3f(v) => Components::from_slice(v),
            Value::Vec4f(v) => Components::from_slice(v),
            Value::Vec2i(v) => Components::from_slice(&[v[0] as f32, v[1] as f32]),
            Value::Vec3i(v) => Components::from_slice(&[v[0] as f32, v[1] as f32, v[2] as f32]),
            Value::Vec4i(v) => Components::from_slice(&[
                v[0] as f32,
                v[1] as f32,
                v[2] as f32,
                v[3] as f32,
            ]),
        }
    }

    /// Map a float-domain representation back into `kind`.
    /// Missing components read as zero.
    pub fn from_components(kind: ValueKind, c: &[f32]) -> Self {
        let at = |i: usize| c.get(i).copied().unwrap_or(0.0);
        match kind {
            ValueKind::Bool => Value::Bool(at(0) > 0.5),
            ValueKind::Int32 => Value::Int32(round_to_i32(at(0))),
            ValueKind::Int64 => Value::Int64(round_to_i64(at(0))),
            ValueKind::Float => Value::Float(at(0)),
            ValueKind::Double => Value::Double(at(0) as f64),
            ValueKind::Vec2f => Value::Vec2f([at(0), at(1)]),
            ValueKind::Vec3f => Value::Vec3f([at(0), at(1), at(2)]),
            ValueKind::Vec4f => Value::Vec4f([at(0), at(1), at(2), at(3)]),
            ValueKind::Vec2i => Value::Vec2i([round_to_i32(at(0)), round_to_i32(at(1))]),
            ValueKind::Vec3i => Value::Vec3i([
                round_to_i32(at(0)),
                round_to_i32(at(1)),
                round_to_i32(at(2)),
            ]),
            ValueKind::Vec4i => Value::Vec4i([
                round_to_i32(at(0)),
                round_to_i32(at(1)),
                round_to_i32(at(2)),
                round_to_i32(at(3)),
            ]),
        }
    }

    /// Extract one component as a scalar value. Scalars only expose axis 0.
    pub fn component(&self, axis: usize) -> Option<Value> {
        match self {
            Value::Vec2f(v) => v.get(axis).map(|c| Value::Float(*c)),
            Value::Vec3f(v) => v.get(axis).map(|c| Value::Float(*c)),
            Value::Vec4f(v) => v.get(axis).map(|c| Value::Float(*c)),
            Value::Vec2i(v) => v.get(axis).map(|c| Value::Int32(*c)),
            Value::Vec3i(v) => v.get(axis).map(|c| Value::Int32(*c)),
            Value::Vec4i(v) => v.get(axis).map(|c| Value::Int32(*c)),
            scalar if axis == 0 => Some(*scalar),
            _ => None,
        }
    }

    /// Project through an instance's component mask.
    pub fn masked(&self, component: VectorComponent) -> Option<Value> {
        match component.axis() {
            None => Some(*self),
            Some(axis) => self.component(axis),
        }
    }

    /// Component-wise sum of two values of the same kind (relative playback).
    /// Booleans combine with logical or; integers wrap.
    pub fn add(&self, other: &Value) -> Option<Value> {
        let sum = match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
            (Value::Int32(a), Value::Int32(b)) => Value::Int32(a.wrapping_add(*b)),
            (Value::Int64(a), Value::Int64(b)) => Value::Int64(a.wrapping_add(*b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            (Value::Vec2f(a), Value::Vec2f(b)) => Value::Vec2f([a[0] + b[0], a[1] + b[1]]),
            (Value::Vec3f(a), Value::Vec3f(b)) => {
                Value::Vec3f([a[0] + b[0], a[1] + b[1], a[2] + b[2]])
            }
            (Value::Vec4f(a), Value::Vec4f(b)) => {
                Value::Vec4f([a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]])
            }
            (Value::Vec2i(a), Value::Vec2i(b)) => {
                Value::Vec2i([a[0].wrapping_add(b[0]), a[1].wrapping_add(b[1])])
            }
            (Value::Vec3i(a), Value::Vec3i(b)) => Value::Vec3i([
                a[0].wrapping_add(b[0]),
                a[1].wrapping_add(b[1]),
                a[2].wrapping_add(b[2]),
            ]),
            (Value::Vec4i(a), Value::Vec4i(b)) => Value::Vec4i([
                a[0].wrapping_add(b[0]),
                a[1].wrapping_add(b[1]),
                a[2].wrapping_add(b[2]),
                a[3].wrapping_add(b[3]),
            ]),
            _ => return None,
        };
        Some(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_round_half_away_from_zero() {
        assert_eq!(
            Value::from_components(ValueKind::Int32, &[2.5]),
            Value::Int32(3)
        );
        assert_eq!(
            Value::from_components(ValueKind::Int32, &[-2.5]),
            Value::Int32(-3)
        );
        assert_eq!(
            Value::from_components(ValueKind::Vec2i, &[0.49, -0.51]),
            Value::Vec2i([0, -1])
        );
    }

    #[test]
    fn bool_threshold() {
        assert_eq!(
            Value::from_components(ValueKind::Bool, &[0.5]),
            Value::Bool(false)
        );
        assert_eq!(
            Value::from_components(ValueKind::Bool, &[0.51]),
            Value::Bool(true)
        );
        assert_eq!(Value::Bool(true).to_components().as_slice(), &[1.0]);
    }

    #[test]
    fn component_extraction_and_mask() {
        let v = Value::Vec3f([1.0, 2.0, 3.0]);
        assert_eq!(v.component(2), Some(Value::Float(3.0)));
        assert_eq!(v.component(3), None);
        assert_eq!(
            Value::Vec2i([4, 5]).masked(VectorComponent::Y),
            Some(Value::Int32(5))
        );
        assert_eq!(Value::Float(1.5).masked(VectorComponent::X), Some(Value::Float(1.5)));
        assert_eq!(Value::Float(1.5).masked(VectorComponent::Y), None);
    }

    #[test]
    fn compatibility_rule() {
        use ValueKind::*;
        assert!(is_binding_compatible(Vec3f, VectorComponent::All, Vec3f));
        assert!(!is_binding_compatible(Vec3f, VectorComponent::All, Float));
        assert!(is_binding_compatible(Vec3f, VectorComponent::Z, Float));
        assert!(!is_binding_compatible(Vec3f, VectorComponent::W, Float));
        assert!(is_binding_compatible(Vec4i, VectorComponent::W, Int32));
        assert!(!is_binding_compatible(Vec2i, VectorComponent::X, Float));
        assert!(is_binding_compatible(Float, VectorComponent::X, Float));
    }

    #[test]
    fn add_same_kind_only() {
        assert_eq!(
            Value::Vec2f([1.0, 2.0]).add(&Value::Vec2f([0.5, 0.5])),
            Some(Value::Vec2f([1.5, 2.5]))
        );
        assert_eq!(Value::Float(1.0).add(&Value::Int32(1)), None);
    }

    #[test]
    fn serde_tagged_shape() {
        let json = serde_json::to_value(Value::Vec2i([1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Vec2i", "data": [1, 2]}));
    }
}

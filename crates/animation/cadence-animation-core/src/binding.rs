//! Data bindings and the host-side sink trait.
//!
//! The store owns [`DataBinding`] records describing *where* a value goes;
//! the host owns the actual properties and implements [`BindingTarget`].
//! Adapters pass their target into the system at construction.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueKind};

/// External handles a binding addresses: none (global property), one object,
/// or an object plus a sub-index.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BindingHandles {
    #[default]
    None,
    One(u32),
    Two(u32, u32),
}

/// Address of an externally owned property.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BindingAddress {
    /// Accessor/property identifier understood by the host
    pub property: u32,
    #[serde(default)]
    pub handles: BindingHandles,
}

impl BindingAddress {
    pub const fn global(property: u32) -> Self {
        Self {
            property,
            handles: BindingHandles::None,
        }
    }

    pub const fn object(property: u32, object: u32) -> Self {
        Self {
            property,
            handles: BindingHandles::One(object),
        }
    }

    pub const fn element(property: u32, object: u32, element: u32) -> Self {
        Self {
            property,
            handles: BindingHandles::Two(object, element),
        }
    }
}

/// Capability to write values of `value_kind` into the property at `address`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataBinding {
    pub address: BindingAddress,
    pub value_kind: ValueKind,
}

impl DataBinding {
    pub fn new(address: BindingAddress, value_kind: ValueKind) -> Self {
        Self {
            address,
            value_kind,
        }
    }
}

/// Host-side property sink.
///
/// `read` is only consulted to capture initial values when an animation
/// starts (relative playback and rollback); hosts that never use either may
/// keep the default.
pub trait BindingTarget {
    fn write(&mut self, address: &BindingAddress, value: &Value);

    fn read(&self, address: &BindingAddress) -> Option<Value> {
        let _ = address;
        None
    }
}

/// In-memory [`BindingTarget`]: a flat property table.
///
/// Records the number of writes so callers can tell "written with the same
/// value" apart from "not written".
#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    values: HashMap<BindingAddress, Value>,
    writes: u64,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a property without counting it as an animation write.
    pub fn insert(&mut self, address: BindingAddress, value: Value) {
        self.values.insert(address, value);
    }

    #[inline]
    pub fn get(&self, address: &BindingAddress) -> Option<Value> {
        self.values.get(address).copied()
    }

    #[inline]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries sorted by address, for stable comparisons across replicas.
    pub fn snapshot(&self) -> Vec<(BindingAddress, Value)> {
        let mut entries: Vec<_> = self.values.iter().map(|(a, v)| (*a, *v)).collect();
        entries.sort_by_key(|(a, _)| (a.property, a.handles_key()));
        entries
    }
}

impl BindingAddress {
    fn handles_key(&self) -> (u8, u32, u32) {
        match self.handles {
            BindingHandles::None => (0, 0, 0),
            BindingHandles::One(a) => (1, a, 0),
            BindingHandles::Two(a, b) => (2, a, b),
        }
    }
}

impl BindingTarget for PropertyTable {
    fn write(&mut self, address: &BindingAddress, value: &Value) {
        self.writes += 1;
        self.values.insert(*address, *value);
    }

    fn read(&self, address: &BindingAddress) -> Option<Value> {
        self.get(address)
    }
}

impl<T: BindingTarget + ?Sized> BindingTarget for &mut T {
    fn write(&mut self, address: &BindingAddress, value: &Value) {
        (**self).write(address, value)
    }

    fn read(&self, address: &BindingAddress) -> Option<Value> {
        (**self).read(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_records_writes() {
        let mut table = PropertyTable::new();
        let addr = BindingAddress::object(1, 7);
        table.insert(addr, Value::Float(1.0));
        assert_eq!(table.write_count(), 0);
        table.write(&addr, &Value::Float(2.0));
        assert_eq!(table.read(&addr), Some(Value::Float(2.0)));
        assert_eq!(table.write_count(), 1);
        assert_eq!(table.read(&BindingAddress::global(1)), None);
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut table = PropertyTable::new();
        table.write(&BindingAddress::element(2, 1, 1), &Value::Int32(3));
        table.write(&BindingAddress::global(2), &Value::Int32(1));
        table.write(&BindingAddress::object(1, 9), &Value::Int32(2));
        let props: Vec<u32> = table.snapshot().iter().map(|(a, _)| a.property).collect();
        assert_eq!(props, vec![1, 2, 2]);
        assert_eq!(table.snapshot()[1].0, BindingAddress::global(2));
    }

    #[test]
    fn address_serde_defaults_handles() {
        let addr: BindingAddress = serde_json::from_str(r#"{"property":4}"#).unwrap();
        assert_eq!(addr, BindingAddress::global(4));
    }
}

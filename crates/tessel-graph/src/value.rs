//! Values stored in a [`Context`](crate::Context): tensors, sequences, maps.

use std::collections::BTreeMap;
use std::fmt;

use tessel_core::any::AnyElement;
use tessel_core::{AnyTensor, Tensor};

/// Key of a [`Value::Map`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
}

/// An opaque runtime value produced or consumed by an operator.
#[derive(Clone, PartialEq)]
pub enum Value {
    Tensor(AnyTensor),
    Sequence(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Tensor(_) => "tensor",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    pub fn as_tensor(&self) -> Option<&AnyTensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_tensor(self) -> Option<AnyTensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Borrow as a typed tensor, if this is a tensor of dtype `T`.
    pub fn typed<T: AnyElement>(&self) -> Option<&Tensor<T>> {
        self.as_tensor().and_then(T::peek)
    }
}

impl From<AnyTensor> for Value {
    fn from(t: AnyTensor) -> Self {
        Value::Tensor(t)
    }
}

impl<T: AnyElement> From<Tensor<T>> for Value {
    fn from(t: Tensor<T>) -> Self {
        Value::Tensor(T::wrap(t))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tensor(t) => fmt::Debug::fmt(t, f),
            Value::Sequence(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let v = Value::from(Tensor::from_vec(vec![1i64, 2], &[2]).unwrap());
        assert_eq!(v.kind(), "tensor");
        assert_eq!(v.typed::<i64>().unwrap().as_slice(), &[1, 2]);
        assert!(v.typed::<f32>().is_none());
    }

    #[test]
    fn test_sequence_and_map() {
        let seq = Value::from(vec![Value::from(Tensor::scalar(1.0f32))]);
        assert_eq!(seq.kind(), "sequence");
        assert!(seq.as_tensor().is_none());

        let mut map = BTreeMap::new();
        map.insert(MapKey::Str("a".into()), Value::from(Tensor::scalar(1u8)));
        let map = Value::Map(map);
        assert_eq!(map.kind(), "map");
        assert!(map.into_tensor().is_none());
    }
}

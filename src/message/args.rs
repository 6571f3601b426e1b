//! Variadic argument lists crossing the topic-dispatch boundary.
//!
//! In-memory dispatch never needs to serialize anything, so `Args` holds
//! trait objects directly; the moment a call needs to cross a process or
//! host boundary (§4.6) it is marshalled into `WireArgs`, a parallel
//! `serde_json::Value` representation carried by the envelope.

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
// (none)

/// A variadic argument list for a local (in-memory) dispatch call.
///
/// Boxed `dyn Any` avoids forcing every actor in a system onto one static
/// message enum — topics are open-ended strings, and argument shapes vary
/// per topic the same way they would in a dynamically typed actor system.
/// Handlers downcast the arguments they expect.
#[derive(Default)]
pub struct Args(Vec<Box<dyn Any + Send>>);

impl Args {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn one<T: Any + Send>(value: T) -> Self {
        Self(vec![Box::new(value)])
    }

    pub fn push<T: Any + Send>(&mut self, value: T) {
        self.0.push(Box::new(value));
    }

    /// Push an already-boxed value, as produced by `Marshaller::unmarshall`.
    pub fn push_boxed(&mut self, value: Box<dyn Any + Send>) {
        self.0.push(value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&(dyn Any + Send)> {
        self.0.get(index).map(|b| b.as_ref())
    }

    /// Downcast the argument at `index`, returning `None` on a type
    /// mismatch or out-of-range index.
    pub fn downcast_ref<T: Any>(&self, index: usize) -> Option<&T> {
        self.get(index).and_then(|v| (v as &dyn Any).downcast_ref())
    }

    pub fn into_vec(self) -> Vec<Box<dyn Any + Send>> {
        self.0
    }
}

impl From<Vec<Box<dyn Any + Send>>> for Args {
    fn from(v: Vec<Box<dyn Any + Send>>) -> Self {
        Self(v)
    }
}

/// The wire representation of an argument list: what actually travels
/// inside an `actor-message` envelope's `marshalledType`/`message` fields.
///
/// Per §4.6 the envelope carries a scalar `marshalledType` if there is
/// exactly one argument, or an array otherwise; `WireArgs` normalizes both
/// shapes into a `Vec<Value>` so callers don't special-case arity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireArgs(pub Vec<Value>);

impl WireArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn single(value: Value) -> Self {
        Self(vec![value])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn args_push_and_downcast() {
        let mut args = Args::new();
        args.push(42i32);
        args.push("hello".to_string());

        assert_eq!(args.len(), 2);
        assert_eq!(args.downcast_ref::<i32>(0), Some(&42));
        assert_eq!(args.downcast_ref::<String>(1).map(String::as_str), Some("hello"));
        assert_eq!(args.downcast_ref::<i32>(1), None);
    }

    #[test]
    fn args_one_constructs_single_element() {
        let args = Args::one(7u8);
        assert_eq!(args.len(), 1);
        assert_eq!(args.downcast_ref::<u8>(0), Some(&7));
    }

    #[test]
    fn wire_args_single_vs_many() {
        let single = WireArgs::single(Value::from(1));
        assert_eq!(single.len(), 1);

        let many = WireArgs::new(vec![Value::from(1), Value::from(2)]);
        assert_eq!(many.len(), 2);
        assert!(!many.is_empty());
    }
}

use std::fmt;

use mem::Handle;

use crate::{Array, Error, Object, Text};

/// Constants identifying the type held by a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Object,
    Array,
    String,
    Int64,
    Uint64,
    Double,
    Bool,
    Null,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Int64 => "int64",
            Kind::Uint64 => "uint64",
            Kind::Double => "double",
            Kind::Bool => "bool",
            Kind::Null => "null",
        })
    }
}

/// Value is one JSON document node. Containers carry the allocator handle
/// they were built on; scalars hold no heap state at all.
#[derive(Debug)]
pub enum Value<'r> {
    Null,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    String(Text<'r>),
    Array(Array<'r>),
    Object(Object<'r>),
}

impl<'r> Value<'r> {
    /// A string value allocated through `handle`.
    pub fn string(s: &str, handle: &Handle<'r>) -> Result<Self, Error> {
        Ok(Value::String(Text::from_str(s, handle)?))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int64(_) => Kind::Int64,
            Value::Uint64(_) => Kind::Uint64,
            Value::Double(_) => Kind::Double,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int64(_) | Value::Uint64(_) | Value::Double(_))
    }

    /// The handle of the container arms; scalars allocate nothing.
    pub fn allocator(&self) -> Option<&Handle<'r>> {
        match self {
            Value::String(s) => Some(s.handle()),
            Value::Array(a) => Some(a.handle()),
            Value::Object(o) => Some(o.handle()),
            _ => None,
        }
    }

    // Optional accessors.

    pub fn if_object(&self) -> Option<&Object<'r>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn if_object_mut(&mut self) -> Option<&mut Object<'r>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn if_array(&self) -> Option<&Array<'r>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn if_array_mut(&mut self) -> Option<&mut Array<'r>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn if_string(&self) -> Option<&Text<'r>> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn if_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn if_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn if_u64(&self) -> Option<u64> {
        match self {
            Value::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn if_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    // Checked accessors.

    pub fn as_object(&self) -> Result<&Object<'r>, Error> {
        self.if_object().ok_or(Error::NotObject)
    }

    pub fn as_object_mut(&mut self) -> Result<&mut Object<'r>, Error> {
        self.if_object_mut().ok_or(Error::NotObject)
    }

    pub fn as_array(&self) -> Result<&Array<'r>, Error> {
        self.if_array().ok_or(Error::NotArray)
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array<'r>, Error> {
        self.if_array_mut().ok_or(Error::NotArray)
    }

    // Panicking accessors, for use where the kind is already established.

    #[track_caller]
    pub fn get_object(&self) -> &Object<'r> {
        self.if_object().expect("value is not an object")
    }

    #[track_caller]
    pub fn get_array(&self) -> &Array<'r> {
        self.if_array().expect("value is not an array")
    }

    #[track_caller]
    pub fn get_string(&self) -> &Text<'r> {
        self.if_string().expect("value is not a string")
    }

    #[track_caller]
    pub fn get_bool(&self) -> bool {
        self.if_bool().expect("value is not a bool")
    }

    // Converting numeric accessors.

    /// This value as an `i64`, converting across numeric kinds when the
    /// mathematical value is representable.
    pub fn to_i64(&self) -> Result<i64, Error> {
        match *self {
            Value::Int64(v) => Ok(v),
            Value::Uint64(v) => i64::try_from(v).map_err(|_| Error::OutOfRange),
            Value::Double(d) => {
                // 2^63 is exactly representable; the in-range check must
                // exclude it while admitting every lesser integer.
                if d.fract() == 0.0 && d >= -9_223_372_036_854_775_808.0 && d < 9_223_372_036_854_775_808.0
                {
                    Ok(d as i64)
                } else {
                    Err(Error::OutOfRange)
                }
            }
            _ => Err(Error::NotNumber),
        }
    }

    pub fn to_u64(&self) -> Result<u64, Error> {
        match *self {
            Value::Int64(v) => u64::try_from(v).map_err(|_| Error::OutOfRange),
            Value::Uint64(v) => Ok(v),
            Value::Double(d) => {
                if d.fract() == 0.0 && d >= 0.0 && d < 18_446_744_073_709_551_616.0 {
                    Ok(d as u64)
                } else {
                    Err(Error::OutOfRange)
                }
            }
            _ => Err(Error::NotNumber),
        }
    }

    pub fn to_f64(&self) -> Result<f64, Error> {
        match *self {
            Value::Int64(v) => Ok(v as f64),
            Value::Uint64(v) => Ok(v as f64),
            Value::Double(d) => Ok(d),
            _ => Err(Error::NotNumber),
        }
    }

    /// Deep copy into `handle`'s resource.
    pub fn clone_in<'t>(&self, handle: &Handle<'t>) -> Result<Value<'t>, Error> {
        Ok(match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int64(v) => Value::Int64(*v),
            Value::Uint64(v) => Value::Uint64(*v),
            Value::Double(v) => Value::Double(*v),
            Value::String(s) => Value::String(s.clone_in(handle)?),
            Value::Array(a) => Value::Array(a.clone_in(handle)?),
            Value::Object(o) => Value::Object(o.clone_in(handle)?),
        })
    }
}

impl Clone for Value<'_> {
    fn clone(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int64(v) => Value::Int64(*v),
            Value::Uint64(v) => Value::Uint64(*v),
            Value::Double(v) => Value::Double(*v),
            Value::String(s) => Value::String(s.clone()),
            Value::Array(a) => Value::Array(a.clone()),
            Value::Object(o) => Value::Object(o.clone()),
        }
    }
}

impl Default for Value<'_> {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => num_eq(a, b),
            _ => false,
        }
    }
}

// Numeric equality by mathematical value across Int64 / Uint64 / Double.
// Integer comparisons against doubles stay exact: the double is checked to
// be integral and in range before converting, rather than widening the
// integer to f64 and losing low bits past 2^53.
fn num_eq(lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    use Value::{Double, Int64, Uint64};
    match (lhs, rhs) {
        (Int64(a), Int64(b)) => a == b,
        (Uint64(a), Uint64(b)) => a == b,
        (Double(a), Double(b)) => a == b,
        (Int64(a), Uint64(b)) | (Uint64(b), Int64(a)) => {
            *a >= 0 && *a as u64 == *b
        }
        (Int64(i), Double(d)) | (Double(d), Int64(i)) => {
            d.fract() == 0.0
                && *d >= -9_223_372_036_854_775_808.0
                && *d < 9_223_372_036_854_775_808.0
                && *d as i64 == *i
        }
        (Uint64(u), Double(d)) | (Double(d), Uint64(u)) => {
            d.fract() == 0.0
                && *d >= 0.0
                && *d < 18_446_744_073_709_551_616.0
                && *d as u64 == *u
        }
        _ => unreachable!("both sides are numbers"),
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = crate::ser::serialize_to_vec(self);
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kinds_and_accessors() {
        let handle = Handle::default();
        let v = Value::string("hi", &handle).unwrap();

        assert_eq!(v.kind(), Kind::String);
        assert_eq!(v.kind().to_string(), "string");
        assert_eq!(v.if_string().unwrap().as_str(), Some("hi"));
        assert_eq!(v.as_object(), Err(Error::NotObject));
        assert_eq!(v.as_array(), Err(Error::NotArray));
        assert_eq!(v.to_i64(), Err(Error::NotNumber));
        assert!(v.allocator().is_some());

        let v = Value::from(42i64);
        assert_eq!(v.kind(), Kind::Int64);
        assert_eq!(v.to_u64(), Ok(42));
        assert_eq!(v.to_f64(), Ok(42.0));
        assert!(v.allocator().is_none());

        assert_eq!(Value::from(-1i64).to_u64(), Err(Error::OutOfRange));
        assert_eq!(Value::from(u64::MAX).to_i64(), Err(Error::OutOfRange));
        assert_eq!(Value::from(0.5).to_i64(), Err(Error::OutOfRange));
    }

    #[test]
    fn test_numeric_cross_kind_equality() {
        assert_eq!(Value::from(20i64), Value::from(20u64));
        assert_eq!(Value::from(20i64), Value::from(20.0));
        assert_eq!(Value::from(20u64), Value::from(20.0));
        assert_eq!(Value::from(-20i64), Value::from(-20.0));

        assert_ne!(Value::from(-1i64), Value::from(u64::MAX));
        assert_ne!(Value::from(20i64), Value::from(20.5));
        assert_ne!(Value::from(1i64), Value::from(true));
        assert_ne!(Value::Null, Value::from(0i64));

        // Exactness near 2^63: i64::MAX is not representable as f64, and
        // must not compare equal to the nearest double (which is 2^63).
        assert_ne!(Value::from(i64::MAX), Value::from(9_223_372_036_854_775_808.0));
        assert_eq!(Value::from(1i64 << 62), Value::from((1u64 << 62) as f64));

        // NaN equals nothing, including itself.
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_deep_equality() {
        let handle = Handle::default();
        let mut a = Array::new(&handle);
        a.push(Value::from(1i64));
        a.push(Value::string("two", &handle).unwrap());

        let b = a.clone();
        assert_eq!(Value::Array(a), Value::Array(b));
    }

    #[test]
    fn test_clone_in_rebinds_allocator() {
        let arena = mem::MonotonicResource::new();
        let arena_handle = Handle::new(&arena);
        let heap_handle = Handle::default();

        let mut obj = Object::new(&heap_handle);
        obj.try_emplace("k", Value::string("v", &heap_handle).unwrap())
            .unwrap();
        let v = Value::Object(obj);

        let copied = v.clone_in(&arena_handle).unwrap();
        assert_eq!(v, copied);

        let obj = copied.get_object();
        assert!(obj.handle().is_equal(&arena_handle));
        let child = obj.get("k").unwrap();
        assert!(child.allocator().unwrap().is_equal(&arena_handle));
    }
}

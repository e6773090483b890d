// The document model: a polymorphic value tree whose containers allocate
// through a pluggable mem::Handle, plus the paired streaming serializer.

mod error;
pub use error::Error;

// Text is the small-string-optimized document string.
mod text;
pub use text::{Text, INLINE_CAP, MAX_TEXT_LEN};

// Array is a contiguous value sequence; empty arrays allocate nothing.
mod array;
pub use array::Array;

// Object is an insertion-ordered map with a salted open-addressed index.
mod object;
pub use object::{Entry, Object};

mod value;
pub use value::{Kind, Value};

// Deep total ordering across every value kind.
mod compare;
pub use compare::compare;

// The resumable value -> bytes producer.
pub mod ser;
pub use ser::{serialize, serialize_to_vec, serialize_with, SerializeOptions, Serializer};

// Values serialize through serde for ecosystem interop.
mod interop;

#[cfg(test)]
mod test {
    use super::*;
    use mem::Handle;

    // Child containers share their parent's allocator handle, recursively.
    fn assert_propagated(value: &Value<'_>, handle: &Handle<'_>) {
        if let Some(h) = value.allocator() {
            assert!(h.is_equal(handle));
        }
        match value {
            Value::Array(a) => a.iter().for_each(|v| assert_propagated(v, handle)),
            Value::Object(o) => o.iter().for_each(|e| {
                assert!(e.key().handle().is_equal(handle));
                assert_propagated(e.value(), handle);
            }),
            _ => (),
        }
    }

    #[test]
    fn test_allocator_propagation() {
        let arena = mem::MonotonicResource::new();
        let arena_handle = Handle::new(&arena);
        let heap_handle = Handle::default();

        // Build a tree mixing values constructed against both resources;
        // insertion rebinds the foreign ones.
        let mut arr = Array::new(&arena_handle);
        arr.push(Value::string("arena", &arena_handle).unwrap());
        arr.push(Value::string("heap", &heap_handle).unwrap());

        let mut obj = Object::new(&arena_handle);
        obj.try_emplace("list", Value::Array(arr)).unwrap();

        let mut foreign = Object::new(&heap_handle);
        foreign
            .try_emplace("deep", Value::string("copy", &heap_handle).unwrap())
            .unwrap();
        obj.try_emplace("nested", Value::Object(foreign)).unwrap();

        assert_propagated(&Value::Object(obj), &arena_handle);
    }

    #[test]
    fn test_static_resource_backed_document() {
        let mut buf = [0u8; 4096];
        let fixed = mem::StaticResource::new(&mut buf);
        let handle = Handle::new(&fixed);

        let mut obj = Object::new(&handle);
        obj.try_emplace("k", Value::from(1i64)).unwrap();
        assert_eq!(ser::serialize(&Value::Object(obj)), r#"{"k":1}"#);
    }

    #[test]
    fn test_null_resource_rejects_construction() {
        let null = mem::NullResource;
        let handle = Handle::new(&null);

        assert_eq!(
            Text::from_str("does not fit inline either way......", &handle).err(),
            Some(Error::BadAlloc)
        );
        // Scalars and empty containers need no allocation at all.
        let arr = Array::new(&handle);
        assert_eq!(arr.len(), 0);
    }
}

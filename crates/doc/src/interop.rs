use crate::Value;

// Documents serialize through any serde Serializer, for interop with the
// wider ecosystem. Strings holding invalid UTF-8 (possible only when parsed
// with validation disabled) are rendered lossily here; the native serializer
// is byte-faithful.
impl serde::Serialize for Value<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Uint64(v) => serializer.serialize_u64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(s) => match s.as_str() {
                Some(s) => serializer.serialize_str(s),
                None => serializer.serialize_str(&String::from_utf8_lossy(s.as_bytes())),
            },
            Value::Array(a) => serializer.collect_seq(a.iter()),
            Value::Object(o) => serializer.collect_map(
                o.iter()
                    .map(|e| (String::from_utf8_lossy(e.key().as_bytes()), e.value())),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{Array, Object, Value};
    use mem::Handle;

    #[test]
    fn test_serde_serialization_matches_native() {
        let handle = Handle::default();

        let mut arr = Array::new(&handle);
        arr.push(Value::from(1i64));
        arr.push(Value::from(18446744073709551615u64));
        arr.push(Value::string("two\nlines", &handle).unwrap());

        let mut obj = Object::new(&handle);
        obj.try_emplace("items", Value::Array(arr)).unwrap();
        obj.try_emplace("f", Value::from(0.5)).unwrap();
        let value = Value::Object(obj);

        let through_serde = serde_json::to_string(&value).unwrap();
        let native = crate::ser::serialize(&value);
        assert_eq!(through_serde, native);

        // And the reference implementation parses our native output.
        let parsed: serde_json::Value = serde_json::from_str(&native).unwrap();
        assert_eq!(parsed["items"][0], serde_json::json!(1));
    }
}

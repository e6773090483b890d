/// Handler is the event sink an [`EventParser`](crate::EventParser) drives,
/// one call per grammatical event in strict document order.
///
/// Every method returns `true` to continue; returning `false` halts the
/// parse immediately with [`Error::Stopped`](doc::Error::Stopped).
///
/// String-like events are delivered incrementally: zero or more `_part`
/// calls carry decoded fragments (split at escape sequences and at input
/// chunk boundaries), and the final non-`_part` call carries the trailing
/// fragment, which may be empty. Escape sequences arrive already decoded.
pub trait Handler {
    fn on_document_begin(&mut self) -> bool {
        true
    }
    fn on_document_end(&mut self) -> bool {
        true
    }

    fn on_object_begin(&mut self) -> bool {
        true
    }
    /// `len` counts the key/value pairs that were delivered.
    fn on_object_end(&mut self, _len: usize) -> bool {
        true
    }

    fn on_array_begin(&mut self) -> bool {
        true
    }
    fn on_array_end(&mut self, _len: usize) -> bool {
        true
    }

    fn on_key_part(&mut self, _bytes: &[u8]) -> bool {
        true
    }
    fn on_key(&mut self, _bytes: &[u8]) -> bool {
        true
    }

    fn on_string_part(&mut self, _bytes: &[u8]) -> bool {
        true
    }
    fn on_string(&mut self, _bytes: &[u8]) -> bool {
        true
    }

    fn on_int64(&mut self, _v: i64) -> bool {
        true
    }
    fn on_uint64(&mut self, _v: u64) -> bool {
        true
    }
    fn on_double(&mut self, _v: f64) -> bool {
        true
    }
    fn on_bool(&mut self, _v: bool) -> bool {
        true
    }
    fn on_null(&mut self) -> bool {
        true
    }

    /// Comment contents, without the `//` / `/*` markers.
    fn on_comment_part(&mut self, _bytes: &[u8]) -> bool {
        true
    }
    fn on_comment(&mut self, _bytes: &[u8]) -> bool {
        true
    }
}

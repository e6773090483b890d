use doc::{Array, Error, Object, Text, Value};
use mem::Handle;

use crate::Handler;

/// ValueBuilder materializes a [`Value`] from parser events.
///
/// Incremental string fragments accumulate on a byte stack; in-progress
/// containers are frames over flat key and value stacks, so building is
/// iterative and its own memory use is independent of document depth. On a
/// container's end event the children are moved into an exactly-sized
/// container allocated through the target handle.
pub struct ValueBuilder<'r> {
    handle: Handle<'r>,
    reject_duplicate_keys: bool,

    scratch: Vec<u8>,
    keys: Vec<Text<'r>>,
    values: Vec<Value<'r>>,
    frames: Vec<Frame>,

    err: Option<Error>,
    done: bool,
}

struct Frame {
    is_object: bool,
    values_mark: usize,
    keys_mark: usize,
}

impl<'r> ValueBuilder<'r> {
    pub fn new(handle: Handle<'r>, reject_duplicate_keys: bool) -> Self {
        Self {
            handle,
            reject_duplicate_keys,
            scratch: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
            frames: Vec::new(),
            err: None,
            done: false,
        }
    }

    /// The first error recorded by a handler callback, if any.
    pub fn error(&self) -> Option<Error> {
        self.err
    }

    pub fn reset(&mut self) {
        self.scratch.clear();
        self.keys.clear();
        self.values.clear();
        self.frames.clear();
        self.err = None;
        self.done = false;
    }

    /// Take the finished document, readying the builder for reuse.
    pub fn release(&mut self) -> Result<Value<'r>, Error> {
        if let Some(err) = self.err {
            return Err(err);
        }
        if !self.done || self.values.len() != 1 {
            return Err(Error::UnexpectedEnd);
        }
        self.done = false;
        Ok(self.values.pop().unwrap())
    }

    // Record a failure and halt the parse.
    fn fail(&mut self, err: Error) -> bool {
        self.err = Some(err);
        false
    }

    fn push_value(&mut self, value: Value<'r>) -> bool {
        self.values.push(value);
        true
    }

    // Assemble the final fragment with any accumulated parts.
    fn take_text(&mut self, last: &[u8]) -> Result<Text<'r>, Error> {
        if self.scratch.is_empty() {
            return Text::from_bytes(last, &self.handle);
        }
        self.scratch.extend_from_slice(last);
        let text = Text::from_bytes(&self.scratch, &self.handle);
        self.scratch.clear();
        text
    }
}

impl<'r> Handler for ValueBuilder<'r> {
    fn on_document_begin(&mut self) -> bool {
        self.reset();
        true
    }

    fn on_document_end(&mut self) -> bool {
        self.done = true;
        true
    }

    fn on_object_begin(&mut self) -> bool {
        self.frames.push(Frame {
            is_object: true,
            values_mark: self.values.len(),
            keys_mark: self.keys.len(),
        });
        true
    }

    fn on_object_end(&mut self, len: usize) -> bool {
        let frame = self.frames.pop().expect("an object frame is open");
        debug_assert!(frame.is_object);
        debug_assert_eq!(len, self.values.len() - frame.values_mark);

        let pairs = self
            .keys
            .drain(frame.keys_mark..)
            .zip(self.values.drain(frame.values_mark..));
        match Object::from_pairs(pairs, &self.handle, self.reject_duplicate_keys) {
            Ok(object) => self.push_value(Value::Object(object)),
            Err(err) => self.fail(err),
        }
    }

    fn on_array_begin(&mut self) -> bool {
        self.frames.push(Frame {
            is_object: false,
            values_mark: self.values.len(),
            keys_mark: self.keys.len(),
        });
        true
    }

    fn on_array_end(&mut self, len: usize) -> bool {
        let frame = self.frames.pop().expect("an array frame is open");
        debug_assert!(!frame.is_object);
        debug_assert_eq!(len, self.values.len() - frame.values_mark);

        match Array::from_iter_in(self.values.drain(frame.values_mark..), &self.handle) {
            Ok(array) => self.push_value(Value::Array(array)),
            Err(err) => self.fail(err),
        }
    }

    fn on_key_part(&mut self, bytes: &[u8]) -> bool {
        self.scratch.extend_from_slice(bytes);
        true
    }

    fn on_key(&mut self, bytes: &[u8]) -> bool {
        match self.take_text(bytes) {
            Ok(key) => {
                self.keys.push(key);
                true
            }
            Err(err) => self.fail(err),
        }
    }

    fn on_string_part(&mut self, bytes: &[u8]) -> bool {
        self.scratch.extend_from_slice(bytes);
        true
    }

    fn on_string(&mut self, bytes: &[u8]) -> bool {
        match self.take_text(bytes) {
            Ok(text) => self.push_value(Value::String(text)),
            Err(err) => self.fail(err),
        }
    }

    fn on_int64(&mut self, v: i64) -> bool {
        self.push_value(Value::Int64(v))
    }

    fn on_uint64(&mut self, v: u64) -> bool {
        self.push_value(Value::Uint64(v))
    }

    fn on_double(&mut self, v: f64) -> bool {
        self.push_value(Value::Double(v))
    }

    fn on_bool(&mut self, v: bool) -> bool {
        self.push_value(Value::Bool(v))
    }

    fn on_null(&mut self) -> bool {
        self.push_value(Value::Null)
    }

    // Comments carry no document content.
}

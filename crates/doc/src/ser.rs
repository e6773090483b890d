use crate::{Entry, Value};

/// How non-finite doubles are rendered. The replacement text is emitted
/// unquoted; the default of `null` keeps the output valid JSON.
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub nan: &'static str,
    pub pinf: &'static str,
    pub ninf: &'static str,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            nan: "null",
            pinf: "null",
            ninf: "null",
        }
    }
}

// Bytes which cannot appear verbatim inside a JSON string.
static NEEDS_ESCAPE: [bool; 256] = build_escape_table();

const fn build_escape_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut b = 0;
    while b < 0x20 {
        table[b] = true;
        b += 1;
    }
    table[b'"' as usize] = true;
    table[b'\\' as usize] = true;
    table
}

/// Serializer is a resumable producer of the serialized form of a value:
/// each [`Serializer::read`] fills the destination with the next chunk of
/// output, suspending at byte granularity, so callers may supply arbitrarily
/// small buffers. Traversal uses an explicit stack and never recurses.
pub struct Serializer<'v> {
    stack: Vec<Frame<'v>>,
    // Bytes of a token that overflowed the previous destination.
    spill: Vec<u8>,
    spill_pos: usize,
    opts: SerializeOptions,
}

enum Frame<'v> {
    Node(&'v Value<'v>),
    ArrayRest {
        iter: std::slice::Iter<'v, Value<'v>>,
        first: bool,
    },
    ObjectRest {
        iter: std::slice::Iter<'v, Entry<'v>>,
        first: bool,
    },
    // Escaped string contents, already inside the opening quote.
    Str {
        bytes: &'v [u8],
        pos: usize,
        close: Close,
    },
}

#[derive(Clone, Copy)]
enum Close {
    Quote,
    QuoteColon,
}

impl<'v> Serializer<'v> {
    pub fn new(value: &'v Value<'v>) -> Self {
        Self::with_options(value, SerializeOptions::default())
    }

    pub fn with_options(value: &'v Value<'v>, opts: SerializeOptions) -> Self {
        Self {
            stack: vec![Frame::Node(value)],
            spill: Vec::new(),
            spill_pos: 0,
            opts,
        }
    }

    /// Restart over `value`, discarding any in-progress output.
    pub fn reset(&mut self, value: &'v Value<'v>) {
        self.stack.clear();
        self.stack.push(Frame::Node(value));
        self.spill.clear();
        self.spill_pos = 0;
    }

    /// True once every byte of output has been read.
    pub fn done(&self) -> bool {
        self.stack.is_empty() && self.spill.is_empty()
    }

    /// Fill `dest` with the next bytes of output, returning how many were
    /// written. Returns 0 exactly when the serializer is done (or `dest` is
    /// empty).
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let mut n = 0;

        // Drain spilled bytes from the previous call first.
        if self.spill_pos < self.spill.len() {
            let take = (self.spill.len() - self.spill_pos).min(dest.len());
            dest[..take].copy_from_slice(&self.spill[self.spill_pos..self.spill_pos + take]);
            self.spill_pos += take;
            n = take;
            if self.spill_pos < self.spill.len() {
                return n;
            }
            self.spill.clear();
            self.spill_pos = 0;
        }

        let mut out = Out {
            dest,
            n,
            spill: &mut self.spill,
        };
        loop {
            if out.full() {
                break;
            }
            let Some(frame) = self.stack.pop() else {
                break;
            };
            step(&mut self.stack, frame, &mut out, &self.opts);
        }
        out.n
    }
}

// Destination cursor. Writes land in `dest` until it fills; the remainder
// of the token spills and is drained by the next read call.
struct Out<'d, 's> {
    dest: &'d mut [u8],
    n: usize,
    spill: &'s mut Vec<u8>,
}

impl Out<'_, '_> {
    fn write(&mut self, bytes: &[u8]) {
        if self.spill.is_empty() {
            let take = bytes.len().min(self.dest.len() - self.n);
            self.dest[self.n..self.n + take].copy_from_slice(&bytes[..take]);
            self.n += take;
            if take < bytes.len() {
                self.spill.extend_from_slice(&bytes[take..]);
            }
        } else {
            self.spill.extend_from_slice(bytes);
        }
    }

    fn full(&self) -> bool {
        self.n == self.dest.len() || !self.spill.is_empty()
    }

    fn remaining(&self) -> usize {
        self.dest.len() - self.n
    }
}

fn step<'v>(
    stack: &mut Vec<Frame<'v>>,
    frame: Frame<'v>,
    out: &mut Out<'_, '_>,
    opts: &SerializeOptions,
) {
    match frame {
        Frame::Node(value) => match value {
            Value::Null => out.write(b"null"),
            Value::Bool(true) => out.write(b"true"),
            Value::Bool(false) => out.write(b"false"),
            Value::Int64(v) => out.write(itoa::Buffer::new().format(*v).as_bytes()),
            Value::Uint64(v) => out.write(itoa::Buffer::new().format(*v).as_bytes()),
            Value::Double(d) if d.is_nan() => out.write(opts.nan.as_bytes()),
            Value::Double(d) if d.is_infinite() => out.write(if *d > 0.0 {
                opts.pinf.as_bytes()
            } else {
                opts.ninf.as_bytes()
            }),
            Value::Double(d) => out.write(ryu::Buffer::new().format_finite(*d).as_bytes()),
            Value::String(s) => {
                out.write(b"\"");
                stack.push(Frame::Str {
                    bytes: s.as_bytes(),
                    pos: 0,
                    close: Close::Quote,
                });
            }
            Value::Array(a) => {
                out.write(b"[");
                stack.push(Frame::ArrayRest {
                    iter: a.iter(),
                    first: true,
                });
            }
            Value::Object(o) => {
                out.write(b"{");
                stack.push(Frame::ObjectRest {
                    iter: o.iter(),
                    first: true,
                });
            }
        },

        Frame::ArrayRest { mut iter, first } => match iter.next() {
            None => out.write(b"]"),
            Some(value) => {
                if !first {
                    out.write(b",");
                }
                stack.push(Frame::ArrayRest { iter, first: false });
                stack.push(Frame::Node(value));
            }
        },

        Frame::ObjectRest { mut iter, first } => match iter.next() {
            None => out.write(b"}"),
            Some(entry) => {
                if !first {
                    out.write(b",");
                }
                stack.push(Frame::ObjectRest { iter, first: false });
                stack.push(Frame::Node(entry.value()));
                out.write(b"\"");
                stack.push(Frame::Str {
                    bytes: entry.key().as_bytes(),
                    pos: 0,
                    close: Close::QuoteColon,
                });
            }
        },

        Frame::Str {
            bytes,
            mut pos,
            close,
        } => loop {
            if out.full() {
                stack.push(Frame::Str { bytes, pos, close });
                return;
            }
            let rest = &bytes[pos..];
            let run = rest
                .iter()
                .position(|&b| NEEDS_ESCAPE[b as usize])
                .unwrap_or(rest.len());

            // Bound the run by the destination so a long clean string
            // suspends instead of spilling wholesale.
            let take = run.min(out.remaining());
            out.write(&bytes[pos..pos + take]);
            pos += take;
            if take < run {
                continue;
            }
            if pos == bytes.len() {
                match close {
                    Close::Quote => out.write(b"\""),
                    Close::QuoteColon => out.write(b"\":"),
                }
                return;
            }
            write_escape(out, bytes[pos]);
            pos += 1;
        },
    }
}

fn write_escape(out: &mut Out<'_, '_>, b: u8) {
    match b {
        b'"' => out.write(b"\\\""),
        b'\\' => out.write(b"\\\\"),
        0x08 => out.write(b"\\b"),
        0x0C => out.write(b"\\f"),
        b'\n' => out.write(b"\\n"),
        b'\r' => out.write(b"\\r"),
        b'\t' => out.write(b"\\t"),
        b => {
            const HEX: &[u8; 16] = b"0123456789abcdef";
            let seq = [
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[(b >> 4) as usize],
                HEX[(b & 0xF) as usize],
            ];
            out.write(&seq);
        }
    }
}

/// Serialize in one shot, driving [`Serializer::read`] with a 4 KiB buffer.
pub fn serialize_to_vec(value: &Value<'_>) -> Vec<u8> {
    serialize_to_vec_with(value, SerializeOptions::default())
}

pub fn serialize_to_vec_with(value: &Value<'_>, opts: SerializeOptions) -> Vec<u8> {
    let mut serializer = Serializer::with_options(value, opts);
    let mut buf = [0u8; 4096];
    let mut out = Vec::new();

    while !serializer.done() {
        let n = serializer.read(&mut buf);
        out.extend_from_slice(&buf[..n]);
    }
    out
}

/// One-shot serialization to a `String`.
///
/// # Panics
/// When the document holds strings that are not valid UTF-8 (possible only
/// for input parsed with UTF-8 validation disabled); use
/// [`serialize_to_vec`] for such documents.
pub fn serialize(value: &Value<'_>) -> String {
    String::from_utf8(serialize_to_vec(value))
        .expect("document contains invalid UTF-8; serialize it to bytes instead")
}

pub fn serialize_with(value: &Value<'_>, opts: SerializeOptions) -> String {
    String::from_utf8(serialize_to_vec_with(value, opts))
        .expect("document contains invalid UTF-8; serialize it to bytes instead")
}

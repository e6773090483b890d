// The incremental, resumable JSON parser: a byte-at-a-time state machine
// over arbitrarily fragmented input, driving a SAX-style handler, plus the
// builder that materializes doc::Value documents.

mod options;
pub use options::ParseOptions;

mod handler;
pub use handler::Handler;

mod event;
pub use event::{EventParser, MAX_DEPTH_CEILING};

// The number literal sub-state-machine.
mod number;

// Incremental UTF-8 validation (Hoehrmann DFA).
mod utf8;

mod builder;
pub use builder::ValueBuilder;

mod parse;
pub use parse::{parse, parse_bytes, parse_bytes_with, parse_with, Parser};

// Callers usually want these alongside the parser.
pub use doc::{Error, Kind, Value};

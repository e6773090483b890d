use doc::{Error, Value};
use mem::Handle;

use crate::{EventParser, ParseOptions, ValueBuilder};

/// Parser is the incremental document parser: an [`EventParser`] driving a
/// [`ValueBuilder`]. Feed any number of [`Parser::write`] chunks, then
/// [`Parser::finish`] and [`Parser::release`] the document.
pub struct Parser<'r> {
    inner: EventParser<ValueBuilder<'r>>,
}

impl Parser<'static> {
    /// A parser with default options, building on the default heap resource.
    pub fn new() -> Self {
        Self::with_options(Handle::default(), ParseOptions::default())
    }
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Parser<'r> {
    pub fn with_resource(handle: Handle<'r>) -> Self {
        Self::with_options(handle, ParseOptions::default())
    }

    pub fn with_options(handle: Handle<'r>, opts: ParseOptions) -> Self {
        let builder = ValueBuilder::new(handle, opts.reject_duplicate_keys);
        Self {
            inner: EventParser::new(builder, opts),
        }
    }

    /// Discard all state, readying the parser for a fresh document.
    pub fn reset(&mut self) {
        self.inner.reset();
        self.inner.handler_mut().reset();
    }

    /// Feed the next chunk of input.
    pub fn write(&mut self, input: &[u8]) -> Result<usize, Error> {
        let result = self.inner.write(input);
        self.surface_builder_error(result)
    }

    /// Terminate the input.
    pub fn finish(&mut self) -> Result<(), Error> {
        let result = self.inner.finish();
        self.surface_builder_error(result).map(|_| ())
    }

    /// Take the finished document.
    pub fn release(&mut self) -> Result<Value<'r>, Error> {
        self.inner.handler_mut().release()
    }

    /// Cumulative bytes consumed; after an error, the offset of the
    /// offending byte.
    pub fn offset(&self) -> u64 {
        self.inner.offset()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    // A builder failure (say, allocation) halts the event parser with
    // `Stopped`; report the underlying cause instead.
    fn surface_builder_error<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        match result {
            Err(Error::Stopped) => Err(self
                .inner
                .handler()
                .error()
                .unwrap_or(Error::Stopped)),
            other => other,
        }
    }
}

/// Parse a complete document with default options on the default resource.
pub fn parse(input: &str) -> Result<Value<'static>, Error> {
    parse_bytes(input.as_bytes())
}

pub fn parse_bytes(input: &[u8]) -> Result<Value<'static>, Error> {
    parse_bytes_with(input, Handle::default(), &ParseOptions::default())
}

/// Parse a complete document into `handle`'s resource.
pub fn parse_with<'r>(
    input: &str,
    handle: Handle<'r>,
    opts: &ParseOptions,
) -> Result<Value<'r>, Error> {
    parse_bytes_with(input.as_bytes(), handle, opts)
}

pub fn parse_bytes_with<'r>(
    input: &[u8],
    handle: Handle<'r>,
    opts: &ParseOptions,
) -> Result<Value<'r>, Error> {
    let mut parser = Parser::with_options(handle, opts.clone());
    parser.write(input)?;
    parser.finish()?;
    parser.release()
}

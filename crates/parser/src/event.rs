use doc::Error;

use crate::number::{NumberParser, Parsed};
use crate::utf8;
use crate::{Handler, ParseOptions};

/// Nesting can never exceed this, whatever `max_depth` asks for.
pub const MAX_DEPTH_CEILING: u32 = u16::MAX as u32;

/// EventParser is the incremental byte-at-a-time JSON state machine. It
/// accepts arbitrarily fragmented input through [`EventParser::write`],
/// resuming from saved state at each call, and drives a [`Handler`] with
/// events in strict document order. It never panics on malformed input;
/// every failure is an [`Error`] reported at the exact byte offset of the
/// offense, independent of how the input was chunked.
pub struct EventParser<H> {
    handler: H,
    opts: ParseOptions,
    state: State,
    frames: Vec<Frame>,
    offset: u64,
    err: Option<Error>,
    begun: bool,

    // Literal keyword progress.
    lit: Lit,
    lit_pos: u8,

    // String scanning state.
    str_is_key: bool,
    utf8_state: u8,
    hex_accum: u16,
    hex_count: u8,
    high_surrogate: u16,

    num: NumberParser,

    // Where to resume after a comment, and a pending '*' inside a block.
    comment_resume: State,
    comment_star: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    // Expecting a value: at the top level or after a colon.
    ValueStart,
    // After '[': a value or an immediate ']'.
    ArrayFirst,
    // After ',' in an array: a value, or ']' under allow_trailing_commas.
    ArrayNext,
    ArrayCommaOrEnd,
    // After '{': a key or an immediate '}'.
    ObjectKeyFirst,
    // After ',' in an object: a key, or '}' under allow_trailing_commas.
    ObjectKeyNext,
    ObjectColon,
    ObjectCommaOrEnd,
    StrBody,
    StrEscape,
    StrHex,
    SurrogateBackslash,
    SurrogateU,
    SurrogateHex,
    Lit,
    Num,
    // After '/': deciding between line and block forms.
    CommentSlash,
    CommentLine,
    CommentBlock,
    Done,
}

#[derive(Clone, Copy)]
enum Container {
    Object,
    Array,
}

struct Frame {
    kind: Container,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lit {
    True,
    False,
    Null,
}

impl Lit {
    fn text(self) -> &'static [u8] {
        match self {
            Lit::True => b"true",
            Lit::False => b"false",
            Lit::Null => b"null",
        }
    }
}

enum Skip {
    Byte(u8),
    Exhausted,
    Comment,
}

fn hex_digit(b: u8) -> Option<u16> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u16),
        b'a'..=b'f' => Some((b - b'a' + 10) as u16),
        b'A'..=b'F' => Some((b - b'A' + 10) as u16),
        _ => None,
    }
}

impl<H: Handler> EventParser<H> {
    pub fn new(handler: H, mut opts: ParseOptions) -> Self {
        opts.max_depth = opts.max_depth.min(MAX_DEPTH_CEILING);
        Self {
            handler,
            opts,
            state: State::ValueStart,
            frames: Vec::new(),
            offset: 0,
            err: None,
            begun: false,
            lit: Lit::Null,
            lit_pos: 0,
            str_is_key: false,
            utf8_state: utf8::ACCEPT,
            hex_accum: 0,
            hex_count: 0,
            high_surrogate: 0,
            num: NumberParser::new(),
            comment_resume: State::ValueStart,
            comment_star: false,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Cumulative bytes consumed; after an error, the offset of the
    /// offending byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True once the top-level value has been fully parsed.
    pub fn is_complete(&self) -> bool {
        self.state == State::Done && self.err.is_none()
    }

    /// Return to the initial state, discarding any error. The handler's own
    /// state is not touched.
    pub fn reset(&mut self) {
        self.state = State::ValueStart;
        self.frames.clear();
        self.offset = 0;
        self.err = None;
        self.begun = false;
        self.num.reset();
        self.comment_star = false;
    }

    /// Feed a chunk. The whole chunk is consumed unless an error stops the
    /// parse, in which case [`EventParser::offset`] points at the offense
    /// and the parser refuses further input until [`EventParser::reset`].
    pub fn write(&mut self, input: &[u8]) -> Result<usize, Error> {
        if let Some(err) = self.err {
            return Err(err);
        }
        if let Err(err) = self.begin() {
            return Err(self.fail(err));
        }
        match self.run(input) {
            Ok(()) => {
                self.offset += input.len() as u64;
                Ok(input.len())
            }
            Err((err, at)) => {
                self.offset += at as u64;
                Err(self.fail(err))
            }
        }
    }

    /// Terminate the input. A pending top-level number is completed; any
    /// other unfinished construct is `UnexpectedEnd`.
    pub fn finish(&mut self) -> Result<(), Error> {
        if let Some(err) = self.err {
            return Err(err);
        }
        if let Err(err) = self.begin() {
            return Err(self.fail(err));
        }
        loop {
            match self.state {
                State::Done => return Ok(()),
                State::Num => {
                    let parsed = match self.num.finish(true) {
                        Ok(parsed) => parsed,
                        Err(err) => return Err(self.fail(err)),
                    };
                    if let Err(err) = self.emit_number(parsed) {
                        return Err(self.fail(err));
                    }
                }
                // A line comment may be ended by the end of input.
                State::CommentLine => {
                    if !self.handler.on_comment(b"") {
                        return Err(self.fail(Error::Stopped));
                    }
                    self.state = self.comment_resume;
                }
                _ => return Err(self.fail(Error::UnexpectedEnd)),
            }
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.err = Some(err);
        err
    }

    fn begin(&mut self) -> Result<(), Error> {
        if !self.begun {
            self.begun = true;
            if !self.handler.on_document_begin() {
                return Err(Error::Stopped);
            }
        }
        Ok(())
    }

    fn run(&mut self, input: &[u8]) -> Result<(), (Error, usize)> {
        let mut pos = 0usize;

        'outer: loop {
            match self.state {
                State::ValueStart | State::ArrayFirst | State::ArrayNext => {
                    let b = match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(b) => b,
                    };
                    match b {
                        b']' if self.state == State::ArrayFirst
                            || (self.state == State::ArrayNext
                                && self.opts.allow_trailing_commas) =>
                        {
                            pos += 1;
                            self.end_array().map_err(|e| (e, pos))?;
                        }
                        b'{' => {
                            self.push_frame(Container::Object).map_err(|e| (e, pos))?;
                            pos += 1;
                            self.state = State::ObjectKeyFirst;
                        }
                        b'[' => {
                            self.push_frame(Container::Array).map_err(|e| (e, pos))?;
                            pos += 1;
                            self.state = State::ArrayFirst;
                        }
                        b'"' => {
                            pos += 1;
                            self.str_is_key = false;
                            self.utf8_state = utf8::ACCEPT;
                            self.state = State::StrBody;
                        }
                        b't' => {
                            self.lit = Lit::True;
                            self.lit_pos = 0;
                            self.state = State::Lit;
                        }
                        b'f' => {
                            self.lit = Lit::False;
                            self.lit_pos = 0;
                            self.state = State::Lit;
                        }
                        b'n' => {
                            self.lit = Lit::Null;
                            self.lit_pos = 0;
                            self.state = State::Lit;
                        }
                        b'-' | b'0'..=b'9' => {
                            self.num.reset();
                            self.state = State::Num;
                        }
                        _ => return Err((Error::ExpectedValue, pos)),
                    }
                }

                State::ObjectKeyFirst | State::ObjectKeyNext => {
                    let b = match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(b) => b,
                    };
                    match b {
                        b'"' => {
                            pos += 1;
                            self.str_is_key = true;
                            self.utf8_state = utf8::ACCEPT;
                            self.state = State::StrBody;
                        }
                        b'}' if self.state == State::ObjectKeyFirst
                            || self.opts.allow_trailing_commas =>
                        {
                            pos += 1;
                            self.end_object().map_err(|e| (e, pos))?;
                        }
                        _ => return Err((Error::ExpectedQuotes, pos)),
                    }
                }

                State::ObjectColon => {
                    match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(b':') => {
                            pos += 1;
                            self.state = State::ValueStart;
                        }
                        Skip::Byte(_) => return Err((Error::ExpectedColon, pos)),
                    }
                }

                State::ObjectCommaOrEnd => {
                    match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(b',') => {
                            pos += 1;
                            self.state = State::ObjectKeyNext;
                        }
                        Skip::Byte(b'}') => {
                            pos += 1;
                            self.end_object().map_err(|e| (e, pos))?;
                        }
                        Skip::Byte(_) => return Err((Error::ExpectedComma, pos)),
                    }
                }

                State::ArrayCommaOrEnd => {
                    match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(b',') => {
                            pos += 1;
                            self.state = State::ArrayNext;
                        }
                        Skip::Byte(b']') => {
                            pos += 1;
                            self.end_array().map_err(|e| (e, pos))?;
                        }
                        Skip::Byte(_) => return Err((Error::ExpectedComma, pos)),
                    }
                }

                State::StrBody => {
                    let validate = !self.opts.allow_invalid_utf8;
                    let run_start = pos;
                    while pos < input.len() {
                        let b = input[pos];
                        if b == b'"' || b == b'\\' {
                            if validate && self.utf8_state != utf8::ACCEPT {
                                // A multi-byte sequence was cut short.
                                return Err((Error::BadUtf8, pos));
                            }
                            if b == b'"' {
                                let frag = &input[run_start..pos];
                                pos += 1;
                                self.emit_str_final(frag).map_err(|e| (e, pos))?;
                            } else {
                                self.emit_str_part(&input[run_start..pos])
                                    .map_err(|e| (e, pos))?;
                                pos += 1;
                                self.state = State::StrEscape;
                            }
                            continue 'outer;
                        }
                        if b < 0x20 {
                            return Err((Error::IllegalControlChar, pos));
                        }
                        if validate {
                            self.utf8_state = utf8::advance(self.utf8_state, b);
                            if self.utf8_state == utf8::REJECT {
                                return Err((Error::BadUtf8, pos));
                            }
                        }
                        pos += 1;
                    }
                    self.emit_str_part(&input[run_start..pos])
                        .map_err(|e| (e, pos))?;
                    return Ok(());
                }

                State::StrEscape => {
                    if pos == input.len() {
                        return Ok(());
                    }
                    let decoded: &[u8] = match input[pos] {
                        b'"' => b"\"",
                        b'\\' => b"\\",
                        b'/' => b"/",
                        b'b' => b"\x08",
                        b'f' => b"\x0C",
                        b'n' => b"\n",
                        b'r' => b"\r",
                        b't' => b"\t",
                        b'u' => {
                            pos += 1;
                            self.hex_accum = 0;
                            self.hex_count = 0;
                            self.state = State::StrHex;
                            continue 'outer;
                        }
                        _ => return Err((Error::BadEscape, pos)),
                    };
                    self.emit_str_part(decoded).map_err(|e| (e, pos))?;
                    pos += 1;
                    self.state = State::StrBody;
                }

                State::StrHex | State::SurrogateHex => {
                    while self.hex_count < 4 {
                        if pos == input.len() {
                            return Ok(());
                        }
                        let Some(d) = hex_digit(input[pos]) else {
                            return Err((Error::BadHexDigit, pos));
                        };
                        self.hex_accum = self.hex_accum << 4 | d;
                        self.hex_count += 1;
                        pos += 1;
                    }
                    let cp = self.hex_accum;
                    if self.state == State::StrHex {
                        if (0xD800..0xDC00).contains(&cp) {
                            self.high_surrogate = cp;
                            self.state = State::SurrogateBackslash;
                        } else if (0xDC00..0xE000).contains(&cp) {
                            // A low surrogate with no preceding high half.
                            return Err((Error::BadSurrogate, pos));
                        } else {
                            self.emit_scalar(cp as u32).map_err(|e| (e, pos))?;
                            self.state = State::StrBody;
                        }
                    } else {
                        if !(0xDC00..0xE000).contains(&cp) {
                            return Err((Error::BadSurrogate, pos));
                        }
                        let cp = 0x10000
                            + (((self.high_surrogate - 0xD800) as u32) << 10)
                            + (cp - 0xDC00) as u32;
                        self.emit_scalar(cp).map_err(|e| (e, pos))?;
                        self.state = State::StrBody;
                    }
                }

                State::SurrogateBackslash => {
                    if pos == input.len() {
                        return Ok(());
                    }
                    if input[pos] != b'\\' {
                        return Err((Error::BadSurrogate, pos));
                    }
                    pos += 1;
                    self.state = State::SurrogateU;
                }

                State::SurrogateU => {
                    if pos == input.len() {
                        return Ok(());
                    }
                    if input[pos] != b'u' {
                        return Err((Error::BadSurrogate, pos));
                    }
                    pos += 1;
                    self.hex_accum = 0;
                    self.hex_count = 0;
                    self.state = State::SurrogateHex;
                }

                State::Lit => {
                    let text = self.lit.text();
                    while (self.lit_pos as usize) < text.len() {
                        if pos == input.len() {
                            return Ok(());
                        }
                        if input[pos] != text[self.lit_pos as usize] {
                            return Err((Error::Syntax, pos));
                        }
                        pos += 1;
                        self.lit_pos += 1;
                    }
                    let ok = match self.lit {
                        Lit::True => self.handler.on_bool(true),
                        Lit::False => self.handler.on_bool(false),
                        Lit::Null => self.handler.on_null(),
                    };
                    if !ok {
                        return Err((Error::Stopped, pos));
                    }
                    self.end_value().map_err(|e| (e, pos))?;
                }

                State::Num => {
                    loop {
                        if pos == input.len() {
                            return Ok(());
                        }
                        match self.num.push(input[pos]) {
                            Ok(true) => pos += 1,
                            Ok(false) => {
                                let parsed =
                                    self.num.finish(false).map_err(|e| (e, pos))?;
                                self.emit_number(parsed).map_err(|e| (e, pos))?;
                                continue 'outer;
                            }
                            Err(err) => return Err((err, pos)),
                        }
                    }
                }

                State::CommentSlash => {
                    if pos == input.len() {
                        return Ok(());
                    }
                    match input[pos] {
                        b'/' => {
                            pos += 1;
                            self.state = State::CommentLine;
                        }
                        b'*' => {
                            pos += 1;
                            self.comment_star = false;
                            self.state = State::CommentBlock;
                        }
                        _ => return Err((Error::Syntax, pos)),
                    }
                }

                State::CommentLine => {
                    let run_start = pos;
                    while pos < input.len() {
                        if input[pos] == b'\n' {
                            if !self.handler.on_comment(&input[run_start..pos]) {
                                return Err((Error::Stopped, pos));
                            }
                            pos += 1;
                            self.state = self.comment_resume;
                            continue 'outer;
                        }
                        pos += 1;
                    }
                    self.emit_comment_part(&input[run_start..pos])
                        .map_err(|e| (e, pos))?;
                    return Ok(());
                }

                State::CommentBlock => {
                    if pos == input.len() {
                        return Ok(());
                    }
                    if self.comment_star {
                        if input[pos] == b'/' {
                            pos += 1;
                            if !self.handler.on_comment(b"") {
                                return Err((Error::Stopped, pos));
                            }
                            self.state = self.comment_resume;
                            continue 'outer;
                        }
                        // The pending '*' was comment content after all.
                        self.comment_star = false;
                        self.emit_comment_part(b"*").map_err(|e| (e, pos))?;
                    }
                    let run_start = pos;
                    while pos < input.len() && input[pos] != b'*' {
                        pos += 1;
                    }
                    self.emit_comment_part(&input[run_start..pos])
                        .map_err(|e| (e, pos))?;
                    if pos < input.len() {
                        pos += 1;
                        self.comment_star = true;
                    }
                }

                State::Done => {
                    match self.skip_ws(input, &mut pos) {
                        Skip::Exhausted => return Ok(()),
                        Skip::Comment => continue 'outer,
                        Skip::Byte(_) => return Err((Error::TrailingGarbage, pos)),
                    }
                }
            }
        }
    }

    fn skip_ws(&mut self, input: &[u8], pos: &mut usize) -> Skip {
        while *pos < input.len() {
            match input[*pos] {
                b' ' | b'\t' | b'\n' | b'\r' => *pos += 1,
                b'/' if self.opts.allow_comments => {
                    self.comment_resume = self.state;
                    self.state = State::CommentSlash;
                    *pos += 1;
                    return Skip::Comment;
                }
                b => return Skip::Byte(b),
            }
        }
        Skip::Exhausted
    }

    fn push_frame(&mut self, kind: Container) -> Result<(), Error> {
        if self.frames.len() >= self.opts.max_depth as usize {
            return Err(Error::TooDeep);
        }
        let ok = match kind {
            Container::Object => self.handler.on_object_begin(),
            Container::Array => self.handler.on_array_begin(),
        };
        if !ok {
            return Err(Error::Stopped);
        }
        self.frames.push(Frame { kind, count: 0 });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Error> {
        let frame = self.frames.pop().expect("an array frame is open");
        if !self.handler.on_array_end(frame.count as usize) {
            return Err(Error::Stopped);
        }
        self.end_value()
    }

    fn end_object(&mut self) -> Result<(), Error> {
        let frame = self.frames.pop().expect("an object frame is open");
        if !self.handler.on_object_end(frame.count as usize) {
            return Err(Error::Stopped);
        }
        self.end_value()
    }

    // A complete value was delivered; route to the enclosing container, or
    // finish the document.
    fn end_value(&mut self) -> Result<(), Error> {
        match self.frames.last_mut() {
            None => {
                self.state = State::Done;
                if !self.handler.on_document_end() {
                    return Err(Error::Stopped);
                }
            }
            Some(frame) => {
                frame.count += 1;
                self.state = match frame.kind {
                    Container::Object => State::ObjectCommaOrEnd,
                    Container::Array => State::ArrayCommaOrEnd,
                };
            }
        }
        Ok(())
    }

    fn emit_number(&mut self, parsed: Parsed) -> Result<(), Error> {
        let ok = match parsed {
            Parsed::Int(v) => self.handler.on_int64(v),
            Parsed::Uint(v) => self.handler.on_uint64(v),
            Parsed::Double(v) => self.handler.on_double(v),
        };
        if !ok {
            return Err(Error::Stopped);
        }
        self.end_value()
    }

    fn emit_str_part(&mut self, frag: &[u8]) -> Result<(), Error> {
        if frag.is_empty() {
            return Ok(());
        }
        let ok = if self.str_is_key {
            self.handler.on_key_part(frag)
        } else {
            self.handler.on_string_part(frag)
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Stopped)
        }
    }

    fn emit_str_final(&mut self, frag: &[u8]) -> Result<(), Error> {
        if self.str_is_key {
            if !self.handler.on_key(frag) {
                return Err(Error::Stopped);
            }
            self.state = State::ObjectColon;
            Ok(())
        } else {
            if !self.handler.on_string(frag) {
                return Err(Error::Stopped);
            }
            self.end_value()
        }
    }

    // Decoded escape bytes are string content too.
    fn emit_scalar(&mut self, cp: u32) -> Result<(), Error> {
        let ch = char::from_u32(cp).expect("a decoded escape is a scalar value");
        let mut buf = [0u8; 4];
        self.emit_str_part(ch.encode_utf8(&mut buf).as_bytes())
    }

    fn emit_comment_part(&mut self, frag: &[u8]) -> Result<(), Error> {
        if frag.is_empty() {
            return Ok(());
        }
        if self.handler.on_comment_part(frag) {
            Ok(())
        } else {
            Err(Error::Stopped)
        }
    }
}

/// Extensions and limits applied to a parse. The default accepts only
/// standard RFC 8259 JSON.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Permit `//…` and `/*…*/` comments anywhere whitespace may appear.
    pub allow_comments: bool,

    /// Permit one comma before a closing `]` or `}`.
    pub allow_trailing_commas: bool,

    /// Skip UTF-8 validation of string contents. Unescaped control
    /// characters below 0x20 are rejected regardless.
    pub allow_invalid_utf8: bool,

    /// Reject documents whose objects repeat a key, instead of the default
    /// behavior of keeping the last occurrence.
    pub reject_duplicate_keys: bool,

    /// Maximum container nesting. Values beyond 65535 are clamped.
    pub max_depth: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_comments: false,
            allow_trailing_commas: false,
            allow_invalid_utf8: false,
            reject_duplicate_keys: false,
            max_depth: 32,
        }
    }
}

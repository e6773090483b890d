use doc::{serialize, Error, Kind, Value};
use mem::Handle;
use parser::{parse, parse_bytes, parse_bytes_with, parse_with, ParseOptions, Parser};
use pretty_assertions::assert_eq;

#[test]
fn test_scalar_documents() {
    assert_eq!(parse("null").unwrap(), Value::Null);
    assert_eq!(parse("true").unwrap(), Value::Bool(true));
    assert_eq!(parse("false").unwrap(), Value::Bool(false));
    assert_eq!(parse("42").unwrap(), Value::Int64(42));
    assert_eq!(parse("-0.5").unwrap(), Value::Double(-0.5));
    assert_eq!(parse(" \t\r\n \"spaced\" \n").unwrap().kind(), Kind::String);
}

#[test]
fn test_array_of_ints_round_trips() {
    let value = parse("[1,2,3]").unwrap();
    let arr = value.get_array();
    assert_eq!(arr.len(), 3);
    for (i, v) in arr.iter().enumerate() {
        assert_eq!(v.kind(), Kind::Int64);
        assert_eq!(v.to_i64().unwrap(), i as i64 + 1);
    }
    assert_eq!(serialize(&value), "[1,2,3]");
}

#[test]
fn test_object_preserves_insertion_order() {
    let value = parse(r#"{"a":1,"b":null,"c":"hello"}"#).unwrap();
    let obj = value.get_object();

    assert_eq!(obj.len(), 3);
    let keys: Vec<_> = obj.keys().map(|k| k.as_str().unwrap().to_owned()).collect();
    assert_eq!(keys, ["a", "b", "c"]);

    assert!(obj.get("b").unwrap().is_null());
    assert_eq!(obj.at("c").unwrap(), &Value::string("hello", &Handle::default()).unwrap());
    assert_eq!(serialize(&value), r#"{"a":1,"b":null,"c":"hello"}"#);
}

#[test]
fn test_number_classification_boundaries() {
    assert_eq!(parse("9223372036854775807").unwrap(), Value::Int64(i64::MAX));
    assert_eq!(
        parse("9223372036854775808").unwrap().kind(),
        Kind::Uint64
    );
    assert_eq!(
        parse("9223372036854775808").unwrap().to_u64().unwrap(),
        9223372036854775808
    );
    assert_eq!(parse("-9223372036854775808").unwrap(), Value::Int64(i64::MIN));

    // One past i64::MIN falls to the double path.
    let value = parse("-9223372036854775809").unwrap();
    assert_eq!(value, Value::Double(-9.223372036854776e18));

    assert_eq!(parse("18446744073709551615").unwrap(), Value::Uint64(u64::MAX));
    assert_eq!(parse("1e400").err(), Some(Error::NumberOutOfRange));
}

#[test]
fn test_trailing_garbage_offset() {
    let mut parser = Parser::new();
    assert_eq!(parser.write(b"[1,2,3] #"), Err(Error::TrailingGarbage));
    assert_eq!(parser.offset(), 8);
}

#[test]
fn test_unexpected_end() {
    let mut parser = Parser::new();
    parser.write(b"[1,2,").unwrap();
    assert_eq!(parser.finish(), Err(Error::UnexpectedEnd));

    for doc in ["{", "[", "\"abc", "{\"a\"", "{\"a\":", "tru", "-"] {
        let mut parser = Parser::new();
        parser.write(doc.as_bytes()).unwrap();
        assert_eq!(parser.finish(), Err(Error::UnexpectedEnd), "{doc:?}");
    }
}

#[test]
fn test_surrogate_pair_decodes() {
    let value = parse("\"\\uD834\\uDD1E\"").unwrap();
    let text = value.get_string();
    assert_eq!(text.as_bytes(), [0xF0, 0x9D, 0x84, 0x9E]);
    assert_eq!(text.as_str(), Some("𝄞"));

    // The escaped and raw spellings parse identically, and re-serialize
    // as raw UTF-8.
    assert_eq!(value, parse(r#""𝄞""#).unwrap());
    assert_eq!(serialize(&value), "\"𝄞\"");
}

#[test]
fn test_bad_surrogates() {
    assert_eq!(parse(r#""\uD834""#).err(), Some(Error::BadSurrogate));
    assert_eq!(parse(r#""\uD834\n""#).err(), Some(Error::BadSurrogate));
    assert_eq!(parse(r#""\uD834 ""#).err(), Some(Error::BadSurrogate));
    assert_eq!(parse(r#""\uDD1E""#).err(), Some(Error::BadSurrogate));
}

#[test]
fn test_depth_limit() {
    let deep = |n: usize| "[".repeat(n) + &"]".repeat(n);

    assert!(parse(&deep(32)).is_ok());

    let mut parser = Parser::new();
    let err = parser.write(deep(33).as_bytes());
    assert_eq!(err, Err(Error::TooDeep));
    assert_eq!(parser.offset(), 32); // The 33rd bracket.

    // The ceiling binds custom limits.
    let opts = ParseOptions {
        max_depth: 2,
        ..ParseOptions::default()
    };
    assert_eq!(
        parse_with("[[[]]]", Handle::default(), &opts).err(),
        Some(Error::TooDeep)
    );
    assert!(parse_with("[[]]", Handle::default(), &opts).is_ok());
}

#[test]
fn test_duplicate_keys_last_wins() {
    let value = parse(r#"{"a":1,"a":2}"#).unwrap();
    assert_eq!(value.get_object().len(), 1);
    assert_eq!(serialize(&value), r#"{"a":2}"#);
}

#[test]
fn test_duplicate_keys_strict_mode() {
    let opts = ParseOptions {
        reject_duplicate_keys: true,
        ..ParseOptions::default()
    };
    assert_eq!(
        parse_with(r#"{"a":1,"a":2}"#, Handle::default(), &opts).err(),
        Some(Error::DuplicateKey)
    );
    assert!(parse_with(r#"{"a":1,"b":2}"#, Handle::default(), &opts).is_ok());
}

#[test]
fn test_syntax_errors() {
    assert_eq!(parse("[1 2]").err(), Some(Error::ExpectedComma));
    assert_eq!(parse(r#"{"a" 1}"#).err(), Some(Error::ExpectedColon));
    assert_eq!(parse("{1: 2}").err(), Some(Error::ExpectedQuotes));
    assert_eq!(parse("[,]").err(), Some(Error::ExpectedValue));
    assert_eq!(parse("[1,]").err(), Some(Error::ExpectedValue));
    assert_eq!(parse(r#"{"a":}"#).err(), Some(Error::ExpectedValue));
    assert_eq!(parse("truth").err(), Some(Error::Syntax));
    assert_eq!(parse("nul!").err(), Some(Error::Syntax));
    assert_eq!(parse("01").err(), Some(Error::Syntax));
    assert_eq!(parse("1.e5").err(), Some(Error::Syntax));
}

#[test]
fn test_string_lexical_errors() {
    assert_eq!(parse("\"raw \n tab\"").err(), Some(Error::IllegalControlChar));
    assert_eq!(parse(r#""\q""#).err(), Some(Error::BadEscape));
    assert_eq!(parse(r#""\u12G4""#).err(), Some(Error::BadHexDigit));
    assert_eq!(parse_bytes(b"\"\xFF\"").err(), Some(Error::BadUtf8));
    assert_eq!(parse_bytes(b"\"\xC2 \"").err(), Some(Error::BadUtf8));
    assert_eq!(parse_bytes(b"\"\xE0\x80\x80\"").err(), Some(Error::BadUtf8));
}

#[test]
fn test_allow_invalid_utf8() {
    let opts = ParseOptions {
        allow_invalid_utf8: true,
        ..ParseOptions::default()
    };

    let value = parse_bytes_with(b"\"ok \xFF\xFE\"", Handle::default(), &opts).unwrap();
    assert_eq!(value.get_string().as_bytes(), b"ok \xFF\xFE");
    assert_eq!(value.get_string().as_str(), None);

    // Raw control characters are rejected regardless.
    assert_eq!(
        parse_bytes_with(b"\"\x01\"", Handle::default(), &opts).err(),
        Some(Error::IllegalControlChar)
    );

    // Such documents serialize to bytes, not String.
    assert_eq!(doc::serialize_to_vec(&value), b"\"ok \xFF\xFE\"");
}

#[test]
fn test_comments_gated_by_option() {
    let input = "[1, // one\n 2 /* and */, 3]";
    assert!(parse(input).is_err());

    let opts = ParseOptions {
        allow_comments: true,
        ..ParseOptions::default()
    };
    let value = parse_with(input, Handle::default(), &opts).unwrap();
    assert_eq!(serialize(&value), "[1,2,3]");

    // An unterminated block comment is an unexpected end.
    let mut parser = Parser::with_options(Handle::default(), opts);
    parser.write(b"[1] /* dangling").unwrap();
    assert_eq!(parser.finish(), Err(Error::UnexpectedEnd));
}

#[test]
fn test_trailing_commas_gated_by_option() {
    assert_eq!(parse("[1,2,]").err(), Some(Error::ExpectedValue));
    assert_eq!(parse(r#"{"a":1,}"#).err(), Some(Error::ExpectedQuotes));

    let opts = ParseOptions {
        allow_trailing_commas: true,
        ..ParseOptions::default()
    };
    assert_eq!(
        serialize(&parse_with("[1,2,]", Handle::default(), &opts).unwrap()),
        "[1,2]"
    );
    assert_eq!(
        serialize(&parse_with(r#"{"a":1,}"#, Handle::default(), &opts).unwrap()),
        r#"{"a":1}"#
    );
    // Still at most one trailing comma.
    assert!(parse_with("[1,,]", Handle::default(), &opts).is_err());
}

#[test]
fn test_empty_containers_and_strings() {
    assert_eq!(serialize(&parse("[]").unwrap()), "[]");
    assert_eq!(serialize(&parse("{}").unwrap()), "{}");
    assert_eq!(serialize(&parse(r#""""#).unwrap()), r#""""#);
    assert_eq!(serialize(&parse("[[],{},\"\"]").unwrap()), "[[],{},\"\"]");
}

#[test]
fn test_escape_decoding() {
    let value = parse(r#""\"\\\/\b\f\n\r\tAé""#).unwrap();
    assert_eq!(
        value.get_string().as_str(),
        Some("\"\\/\u{8}\u{c}\n\r\tAé")
    );
}

#[test]
fn test_reference_agreement_on_fixture() {
    // Cross-check a non-trivial document against the reference parser.
    let input = r#"{"nested":{"arr":[0.25,-17,"x",[true,null]],"big":184467440737095516,"s":"é😀"},"tail":false}"#;
    let ours = parse(input).unwrap();
    let theirs: serde_json::Value = serde_json::from_str(input).unwrap();

    assert_eq!(
        serde_json::to_value(&ours).unwrap(),
        theirs,
        "serde view of our document equals the reference parse"
    );
    // And our serialization parses back identically under the reference.
    let re: serde_json::Value = serde_json::from_str(&serialize(&ours)).unwrap();
    assert_eq!(re, theirs);
}

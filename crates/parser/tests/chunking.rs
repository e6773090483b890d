use doc::{serialize, serialize_to_vec, Error, Serializer, Value};
use mem::Handle;
use parser::{parse, parse_bytes, Parser};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

// A generated document, biased toward shallow nesting.
#[derive(Clone, Debug)]
struct ArbDoc(Value<'static>);

impl Arbitrary for ArbDoc {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbDoc(arbitrary_value(g, 3))
    }
}

fn arbitrary_value(g: &mut Gen, depth: usize) -> Value<'static> {
    let handle = Handle::default();
    let limit = if depth == 0 { 6 } else { 8 };
    match u8::arbitrary(g) % limit {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Int64(i64::arbitrary(g)),
        3 => Value::Uint64(u64::arbitrary(g)),
        4 => {
            let d = f64::arbitrary(g);
            Value::Double(if d.is_finite() { d } else { 0.5 })
        }
        5 => Value::string(&String::arbitrary(g), &handle).unwrap(),
        6 => {
            let mut arr = doc::Array::new(&handle);
            for _ in 0..usize::arbitrary(g) % 4 {
                arr.push(arbitrary_value(g, depth - 1));
            }
            Value::Array(arr)
        }
        _ => {
            let mut obj = doc::Object::new(&handle);
            for _ in 0..usize::arbitrary(g) % 4 {
                obj.try_emplace(&String::arbitrary(g), arbitrary_value(g, depth - 1))
                    .unwrap();
            }
            Value::Object(obj)
        }
    }
}

// Split `input` at the given cut points and feed it chunk by chunk.
fn parse_chunked(input: &[u8], cuts: &[usize]) -> (Result<Value<'static>, Error>, u64) {
    let mut parser = Parser::new();
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (input.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut from = 0;
    for cut in cuts.into_iter().chain([input.len()]) {
        if let Err(err) = parser.write(&input[from..cut]) {
            return (Err(err), parser.offset());
        }
        from = cut;
    }
    if let Err(err) = parser.finish() {
        return (Err(err), parser.offset());
    }
    (parser.release(), parser.offset())
}

#[quickcheck]
fn prop_round_trip(doc: ArbDoc) -> bool {
    let bytes = serialize_to_vec(&doc.0);
    parse_bytes(&bytes).unwrap() == doc.0
}

#[quickcheck]
fn prop_chunking_is_irrelevant(doc: ArbDoc, cuts: Vec<usize>) -> bool {
    let bytes = serialize_to_vec(&doc.0);
    let whole = parse_bytes(&bytes).unwrap();
    let (chunked, _) = parse_chunked(&bytes, &cuts);
    chunked.unwrap() == whole
}

#[quickcheck]
fn prop_chunked_errors_match_whole(doc: ArbDoc, cuts: Vec<usize>, flip: usize) -> bool {
    // Corrupt one byte of a valid serialization; whichever way the input is
    // chunked, the outcome and offset must agree with the whole-input parse.
    let mut bytes = serialize_to_vec(&doc.0);
    let at = flip % bytes.len();
    bytes[at] = bytes[at].wrapping_add(1 + (flip % 7) as u8);

    let (whole, whole_offset) = parse_chunked(&bytes, &[]);
    let (chunked, chunked_offset) = parse_chunked(&bytes, &cuts);

    match (whole, chunked) {
        (Ok(a), Ok(b)) => a == b,
        (Err(a), Err(b)) => a == b && whole_offset == chunked_offset,
        _ => false,
    }
}

#[quickcheck]
fn prop_serializer_resumes_across_any_buffer_sizes(doc: ArbDoc, sizes: Vec<u8>) -> bool {
    let expect = serialize_to_vec(&doc.0);

    let mut serializer = Serializer::new(&doc.0);
    let mut got = Vec::new();
    let sizes = if sizes.is_empty() { vec![3] } else { sizes };
    let mut sizes = sizes.into_iter().map(|s| s as usize % 17 + 1).cycle();
    while !serializer.done() {
        let mut buf = vec![0u8; sizes.next().unwrap()];
        let n = serializer.read(&mut buf);
        got.extend_from_slice(&buf[..n]);
    }
    got == expect
}

#[quickcheck]
fn prop_fuzz_never_panics(bytes: Vec<u8>, cuts: Vec<usize>) -> bool {
    // Arbitrary input either parses or errors; it never panics, and any
    // parsed document serializes cleanly.
    let (result, _) = parse_chunked(&bytes, &cuts);
    if let Ok(value) = result {
        serialize_to_vec(&value);
    }
    true
}

#[test]
fn test_reset_is_indistinguishable_from_fresh() {
    let mut parser = Parser::new();

    // Abandon a parse mid-flight, and a failed parse besides.
    parser.write(br#"{"partial": [1, 2"#).unwrap();
    parser.reset();
    assert_eq!(parser.write(b"}garbage"), Err(Error::ExpectedValue));
    parser.reset();

    parser.write(b"[1,").unwrap();
    parser.write(b"2]").unwrap();
    parser.finish().unwrap();
    assert_eq!(serialize(&parser.release().unwrap()), "[1,2]");

    // Offset restarts with the parser.
    parser.reset();
    parser.write(b"7").unwrap();
    parser.finish().unwrap();
    assert_eq!(parser.offset(), 1);
    assert_eq!(parser.release().unwrap(), Value::Int64(7));
}

#[test]
fn test_release_readies_for_next_document() {
    let mut parser = Parser::new();
    for expect in ["[1]", "{\"a\":true}", "\"three\""] {
        parser.reset();
        parser.write(expect.as_bytes()).unwrap();
        parser.finish().unwrap();
        assert_eq!(serialize(&parser.release().unwrap()), expect);
    }
}

#[test]
fn test_chunk_boundaries_inside_every_token() {
    // One-byte writes cut through strings, escapes, surrogates, literals,
    // and numbers alike.
    let doc = "{\"k\\u0041y\": [true, -12.5e2, \"\\uD834\\uDD1E𝄞\", null]}";
    let whole = parse(doc).unwrap();

    let mut parser = Parser::new();
    for b in doc.as_bytes() {
        parser.write(std::slice::from_ref(b)).unwrap();
    }
    parser.finish().unwrap();
    let chunked = parser.release().unwrap();

    assert_eq!(whole, chunked);
    assert_eq!(
        chunked.get_object().get("kAy").unwrap().get_array()[2],
        Value::string("𝄞𝄞", &Handle::default()).unwrap()
    );
}

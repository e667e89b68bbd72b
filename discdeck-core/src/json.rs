//! Minimal JSON reader and writer for the catalog files.
//!
//! The reader is a small recursive-descent parser producing a document tree,
//! so key lookup is always scoped to one object and a `"title"` inside a
//! track can never shadow a slot field. It stays forgiving on purpose: the
//! device that wrote these files could lose power mid-write, so malformed
//! input makes the surrounding value absent and callers fall back to
//! defaults instead of failing the whole load.
//!
//! The writer escapes only `"` and `\`, which is the complete escape set the
//! reader understands and the only one the original files ever contained.

use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Parses a document from `input`. Returns `None` if no value can be
    /// read at all; trailing bytes after a complete value are ignored.
    pub fn parse(input: &str) -> Option<Value> {
        let mut parser = Parser {
            bytes: input.as_bytes(),
            pos: 0,
        };
        parser.skip_ws();
        parser.value()
    }

    /// Looks up `key` in this object. `None` for missing keys and for
    /// non-object values.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn str_of(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn int_of(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_int()
    }

    pub fn bool_of(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn array_of(&self, key: &str) -> Option<&[Value]> {
        self.get(key)?.as_array()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_literal(&mut self, literal: &str) -> bool {
        if self.bytes[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            b'{' => self.object(),
            b'[' => self.array(),
            b'"' => self.string().map(Value::Str),
            b't' | b'f' => self.boolean(),
            b'n' => self.eat_literal("null").then_some(Value::Null),
            b'-' | b'0'..=b'9' => self.integer(),
            _ => None,
        }
    }

    fn object(&mut self) -> Option<Value> {
        self.eat(b'{');
        let mut entries = Vec::new();
        self.skip_ws();
        if self.eat(b'}') {
            return Some(Value::Object(entries));
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.skip_ws();
            if !self.eat(b':') {
                return None;
            }
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            if self.eat(b'}') {
                return Some(Value::Object(entries));
            }
            return None;
        }
    }

    fn array(&mut self) -> Option<Value> {
        self.eat(b'[');
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(b']') {
            return Some(Value::Array(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            if self.eat(b']') {
                return Some(Value::Array(items));
            }
            return None;
        }
    }

    fn string(&mut self) -> Option<String> {
        if !self.eat(b'"') {
            return None;
        }
        let mut out = String::new();
        loop {
            match self.peek()? {
                b'"' => {
                    self.pos += 1;
                    return Some(out);
                }
                b'\\' => {
                    self.pos += 1;
                    match self.peek()? {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        // Unknown escape, keep it verbatim.
                        other => {
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                    self.pos += 1;
                }
                _ => {
                    // Byte-wise copy keeps multi-byte UTF-8 intact, since the
                    // escape characters are all ASCII.
                    let start = self.pos;
                    while !matches!(self.peek(), None | Some(b'"' | b'\\')) {
                        self.pos += 1;
                    }
                    out.push_str(&String::from_utf8_lossy(&self.bytes[start..self.pos]));
                }
            }
        }
    }

    fn boolean(&mut self) -> Option<Value> {
        if self.eat_literal("true") {
            Some(Value::Bool(true))
        } else if self.eat_literal("false") {
            Some(Value::Bool(false))
        } else {
            None
        }
    }

    fn integer(&mut self) -> Option<Value> {
        let negative = self.eat(b'-');
        let mut seen = false;
        let mut n: i64 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            seen = true;
            // No overflow checking, oversized input wraps.
            n = n.wrapping_mul(10).wrapping_add((digit - b'0') as i64);
            self.pos += 1;
        }
        if !seen {
            return None;
        }
        Some(Value::Int(if negative { n.wrapping_neg() } else { n }))
    }
}

/// Append-only JSON writer with comma bookkeeping per nesting level.
pub struct JsonWriter<W: Write> {
    sink: W,
    needs_comma: Vec<bool>,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(sink: W) -> JsonWriter<W> {
        JsonWriter {
            sink,
            needs_comma: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn separate(&mut self) -> io::Result<()> {
        if let Some(pending) = self.needs_comma.last_mut() {
            if *pending {
                self.sink.write_all(b",")?;
            }
            *pending = true;
        }
        Ok(())
    }

    pub fn begin_object(&mut self) -> io::Result<()> {
        self.separate()?;
        self.needs_comma.push(false);
        self.sink.write_all(b"{")
    }

    pub fn end_object(&mut self) -> io::Result<()> {
        self.needs_comma.pop();
        self.sink.write_all(b"}")
    }

    pub fn begin_array(&mut self) -> io::Result<()> {
        self.separate()?;
        self.needs_comma.push(false);
        self.sink.write_all(b"[")
    }

    pub fn end_array(&mut self) -> io::Result<()> {
        self.needs_comma.pop();
        self.sink.write_all(b"]")
    }

    pub fn key(&mut self, name: &str) -> io::Result<()> {
        self.separate()?;
        write_escaped(&mut self.sink, name)?;
        self.sink.write_all(b":")?;
        // The value following the key must not emit another comma.
        if let Some(pending) = self.needs_comma.last_mut() {
            *pending = false;
        }
        Ok(())
    }

    pub fn string(&mut self, value: &str) -> io::Result<()> {
        self.separate()?;
        write_escaped(&mut self.sink, value)
    }

    pub fn int(&mut self, value: i64) -> io::Result<()> {
        self.separate()?;
        write!(self.sink, "{}", value)
    }

    pub fn boolean(&mut self, value: bool) -> io::Result<()> {
        self.separate()?;
        let literal: &[u8] = if value { b"true" } else { b"false" };
        self.sink.write_all(literal)
    }
}

/// Writes `value` as a quoted JSON string, escaping `"` and `\`. Empty input
/// writes `""`.
pub fn write_escaped<W: Write>(sink: &mut W, value: &str) -> io::Result<()> {
    sink.write_all(b"\"")?;
    let mut rest = value;
    while let Some(at) = rest.find(['"', '\\']) {
        sink.write_all(rest[..at].as_bytes())?;
        sink.write_all(b"\\")?;
        sink.write_all(&rest.as_bytes()[at..at + 1])?;
        rest = &rest[at + 1..];
    }
    sink.write_all(rest.as_bytes())?;
    sink.write_all(b"\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut JsonWriter<&mut Vec<u8>>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        let mut w = JsonWriter::new(&mut buf);
        f(&mut w).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(Value::parse("42"), Some(Value::Int(42)));
        assert_eq!(Value::parse("-7"), Some(Value::Int(-7)));
        assert_eq!(Value::parse("true"), Some(Value::Bool(true)));
        assert_eq!(Value::parse("false"), Some(Value::Bool(false)));
        assert_eq!(Value::parse("null"), Some(Value::Null));
        assert_eq!(Value::parse("\"hi\""), Some(Value::Str("hi".into())));
    }

    #[test]
    fn key_lookup_is_scoped_to_one_object() {
        let doc = Value::parse(r#"{"title":"outer","tracks":[{"title":"inner"}]}"#).unwrap();
        assert_eq!(doc.str_of("title"), Some("outer"));
        let tracks = doc.array_of("tracks").unwrap();
        assert_eq!(tracks[0].str_of("title"), Some("inner"));
    }

    #[test]
    fn missing_and_mistyped_fields_read_as_absent() {
        let doc = Value::parse(r#"{"year":"not a number"}"#).unwrap();
        assert_eq!(doc.int_of("year"), None);
        assert_eq!(doc.int_of("absent"), None);
        assert_eq!(doc.str_of("year"), Some("not a number"));
    }

    #[test]
    fn malformed_input_is_absent_not_fatal() {
        assert_eq!(Value::parse(""), None);
        assert_eq!(Value::parse("{\"a\":"), None);
        assert_eq!(Value::parse("[1,2"), None);
        assert_eq!(Value::parse("{broken}"), None);
        // A truncated tail is tolerated at the top level once a value parsed.
        assert_eq!(Value::parse("7 trailing"), Some(Value::Int(7)));
    }

    #[test]
    fn unescapes_quote_and_backslash_only() {
        let doc = Value::parse(r#""a \"b\" c:\\d \n""#).unwrap();
        assert_eq!(doc.as_str(), Some(r#"a "b" c:\d \n"#));
    }

    #[test]
    fn escape_round_trip() {
        let original = r#"say "hi" to C:\disc\1"#;
        let mut buf = Vec::new();
        write_escaped(&mut buf, original).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let back = Value::parse(&text).unwrap();
        assert_eq!(back.as_str(), Some(original));
    }

    #[test]
    fn writer_output_is_valid_json() {
        let text = written(|w| {
            w.begin_object()?;
            w.key("version")?;
            w.int(1)?;
            w.key("name")?;
            w.string("A \"quoted\" name")?;
            w.key("items")?;
            w.begin_array()?;
            w.int(1)?;
            w.boolean(false)?;
            w.string("")?;
            w.end_array()?;
            w.end_object()
        });
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["version"], 1);
        assert_eq!(parsed["name"], "A \"quoted\" name");
        assert_eq!(parsed["items"][2], "");
    }

    #[test]
    fn oversized_integers_wrap() {
        let doc = Value::parse("99999999999999999999999999").unwrap();
        // Wraps per normal integer arithmetic rather than erroring.
        assert!(doc.as_int().is_some());
    }
}

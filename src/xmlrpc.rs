//! Minimal XML-RPC codec for the iThenticate API.
//!
//! Covers the value types the API uses: `int`/`i4`, `boolean`, `string`,
//! `double`, `base64`, `dateTime.iso8601` (kept as text), `struct`, `array`
//! and `nil`. Untyped `<value>text</value>` is a string.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Base64(Vec<u8>),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// Struct member lookup; `None` for non-structs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Integer view. The API sends some numbers as strings and some flags as
    /// booleans, so both are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Build a struct value from `(name, value)` pairs.
pub fn structure<I, K>(members: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("invalid XML: {0}")]
    Xml(String),
    #[error("malformed XML-RPC message: {0}")]
    Malformed(String),
    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

impl From<quick_xml::Error> for XmlRpcError {
    fn from(e: quick_xml::Error) -> Self {
        XmlRpcError::Xml(e.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for XmlRpcError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        XmlRpcError::Xml(e.to_string())
    }
}

// ============ Encoding ============

/// Serialize a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

/// Serialize a successful `methodResponse` document.
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>\n");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
        Value::Bool(b) => out.push_str(if *b {
            "<boolean>1</boolean>"
        } else {
            "<boolean>0</boolean>"
        }),
        Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

// ============ Decoding ============

/// Parse a `methodResponse`. A `<fault>` becomes [`XmlRpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut in_fault = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"fault" => in_fault = true,
                b"value" => {
                    let value = parse_value(&mut reader)?;
                    return if in_fault {
                        Err(fault_from(&value))
                    } else {
                        Ok(value)
                    };
                }
                _ => {}
            },
            Event::Eof => {
                return Err(XmlRpcError::Malformed(
                    "response carries no <value>".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// Parse a `methodCall` into its method name and parameters.
pub fn decode_call(xml: &str) -> Result<(String, Vec<Value>), XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut method = None;
    let mut params = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"methodName" => method = Some(read_text(&mut reader, b"methodName")?),
                b"value" => params.push(parse_value(&mut reader)?),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let method =
        method.ok_or_else(|| XmlRpcError::Malformed("call carries no <methodName>".to_string()))?;
    Ok((method, params))
}

fn fault_from(value: &Value) -> XmlRpcError {
    XmlRpcError::Fault {
        code: value.get("faultCode").and_then(Value::as_i64).unwrap_or(0),
        message: value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault")
            .to_string(),
    }
}

/// Parse the contents of a `<value>` whose start tag was just consumed,
/// through its end tag.
fn parse_value(reader: &mut Reader<&[u8]>) -> Result<Value, XmlRpcError> {
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name().as_ref() == b"value" => {
                return Ok(Value::String(text));
            }
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                let value = parse_typed(reader, &tag)?;
                expect_end(reader, b"value")?;
                return Ok(value);
            }
            Event::Empty(e) => {
                let value = match e.name().as_ref() {
                    b"nil" => Value::Nil,
                    b"string" => Value::String(String::new()),
                    b"base64" => Value::Base64(Vec::new()),
                    b"array" => Value::Array(Vec::new()),
                    b"struct" => Value::Struct(BTreeMap::new()),
                    other => {
                        return Err(XmlRpcError::Malformed(format!(
                            "empty <{}/> is not a value",
                            String::from_utf8_lossy(other)
                        )))
                    }
                };
                expect_end(reader, b"value")?;
                return Ok(value);
            }
            Event::Eof => return Err(unexpected_eof("value")),
            _ => {}
        }
    }
}

fn parse_typed(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<Value, XmlRpcError> {
    match tag {
        b"int" | b"i4" | b"i8" => {
            let text = read_text(reader, tag)?;
            text.trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| XmlRpcError::Malformed(format!("invalid integer '{}'", text)))
        }
        b"boolean" => match read_text(reader, tag)?.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(XmlRpcError::Malformed(format!("invalid boolean '{}'", other))),
        },
        b"double" => {
            let text = read_text(reader, tag)?;
            text.trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| XmlRpcError::Malformed(format!("invalid double '{}'", text)))
        }
        b"string" | b"dateTime.iso8601" => Ok(Value::String(read_text(reader, tag)?)),
        b"base64" => {
            let text = read_text(reader, tag)?;
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| XmlRpcError::Malformed(format!("invalid base64: {}", e)))
        }
        b"nil" => {
            expect_end(reader, b"nil")?;
            Ok(Value::Nil)
        }
        b"struct" => parse_struct(reader),
        b"array" => parse_array(reader),
        other => Err(XmlRpcError::Malformed(format!(
            "unknown value type <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn parse_struct(reader: &mut Reader<&[u8]>) -> Result<Value, XmlRpcError> {
    let mut members = BTreeMap::new();
    let mut name: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"member" => name = None,
                b"name" => name = Some(read_text(reader, b"name")?),
                b"value" => {
                    let value = parse_value(reader)?;
                    let key = name.take().ok_or_else(|| {
                        XmlRpcError::Malformed("struct member without <name>".to_string())
                    })?;
                    members.insert(key, value);
                }
                other => {
                    return Err(XmlRpcError::Malformed(format!(
                        "unexpected <{}> in struct",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                if let Some(key) = name.take() {
                    members.insert(key, Value::String(String::new()));
                }
            }
            Event::End(e) if e.name().as_ref() == b"struct" => return Ok(Value::Struct(members)),
            Event::Eof => return Err(unexpected_eof("struct")),
            _ => {}
        }
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Result<Value, XmlRpcError> {
    let mut items = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"data" => {}
                b"value" => items.push(parse_value(reader)?),
                other => {
                    return Err(XmlRpcError::Malformed(format!(
                        "unexpected <{}> in array",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                items.push(Value::String(String::new()))
            }
            Event::End(e) if e.name().as_ref() == b"array" => return Ok(Value::Array(items)),
            Event::Eof => return Err(unexpected_eof("array")),
            _ => {}
        }
    }
}

/// Collect text up to the closing `tag`.
fn read_text(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<String, XmlRpcError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name().as_ref() == tag => return Ok(text),
            Event::Eof => return Err(unexpected_eof(&String::from_utf8_lossy(tag))),
            Event::Start(e) => {
                return Err(XmlRpcError::Malformed(format!(
                    "unexpected <{}> inside text",
                    String::from_utf8_lossy(e.name().as_ref())
                )))
            }
            _ => {}
        }
    }
}

/// Skip whitespace up to the closing `tag`.
fn expect_end(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<(), XmlRpcError> {
    loop {
        match reader.read_event()? {
            Event::End(e) if e.name().as_ref() == tag => return Ok(()),
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
            Event::Comment(_) => {}
            Event::Eof => return Err(unexpected_eof(&String::from_utf8_lossy(tag))),
            other => {
                return Err(XmlRpcError::Malformed(format!(
                    "expected </{}>, found {:?}",
                    String::from_utf8_lossy(tag),
                    other
                )))
            }
        }
    }
}

fn unexpected_eof(tag: &str) -> XmlRpcError {
    XmlRpcError::Malformed(format!("document ended inside <{}>", tag))
}

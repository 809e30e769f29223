//! Response body decoding by content type.
//!
//! JSON bodies become a `serde_json::Value`. XML bodies are converted into
//! the same value model: the root element's content is the top-level object,
//! text-only elements are strings, repeated siblings are arrays, attributes
//! live under `@attributes` and empty elements are empty objects.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Key holding an element's attributes in an XML tree.
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Key holding an element's text when it also carries attributes.
pub const TEXT_KEY: &str = "#text";

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A JSON document.
    Json(Value),
    /// An XML document converted to a value tree.
    Xml(Value),
    /// Anything else, kept as bytes.
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// Decodes `body` according to `content_type`.
    ///
    /// Empty bodies are always `Raw`.
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON or XML body is malformed.
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self, ClientError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::Raw(body.to_vec()));
        }

        match BodyKind::of(content_type) {
            BodyKind::Json => Ok(Self::Json(serde_json::from_slice(body)?)),
            BodyKind::Xml => Ok(Self::Xml(parse_xml(body)?)),
            BodyKind::Other => Ok(Self::Raw(body.to_vec())),
        }
    }

    /// The structured value, for JSON and XML bodies.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Json(value) | Self::Xml(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Whether the body carries nothing usable.
    ///
    /// Empty raw bodies and JSON `null`, `false`, `""` and `[]` are falsy.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Raw(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
            Self::Json(value) | Self::Xml(value) => match value {
                Value::Null | Value::Bool(false) => true,
                Value::String(text) => text.is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            },
        }
    }
}

/// Body family selected from a `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/json` and friends.
    Json,
    /// `text/xml`, `application/xml` and friends.
    Xml,
    /// Anything else.
    Other,
}

impl BodyKind {
    /// Classifies a content type.
    #[must_use]
    pub fn of(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Other;
        };
        let content_type = content_type.to_ascii_lowercase();

        if content_type.contains("json") {
            Self::Json
        } else if content_type.contains("xml") {
            Self::Xml
        } else {
            Self::Other
        }
    }

    /// Whether bodies of this kind can be decoded into a value tree.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json | Self::Xml)
    }
}

struct Element {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ClientError> {
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| ClientError::XmlError(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| ClientError::XmlError(e.to_string()))?;
            attributes.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn attach(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            // Element values are never arrays, so an array here means repetition.
            Some(Value::Array(siblings)) => siblings.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn close(self) -> (String, Value) {
        let Self {
            name,
            attributes,
            mut children,
            text,
        } = self;

        if children.is_empty() && attributes.is_empty() {
            let value = if text.is_empty() {
                Value::Object(Map::new())
            } else {
                Value::String(text)
            };
            return (name, value);
        }

        if !attributes.is_empty() {
            children.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }
        if !text.is_empty() {
            children.insert(TEXT_KEY.to_string(), Value::String(text));
        }

        (name, Value::Object(children))
    }
}

/// Parses an XML document into a value tree.
///
/// # Examples
///
/// ```
/// use spapi_client::body::parse_xml;
///
/// let tree = parse_xml(b"<Envelope><Item>a</Item><Item>b</Item><Empty/></Envelope>").unwrap();
/// assert_eq!(tree["Item"], serde_json::json!(["a", "b"]));
/// assert_eq!(tree["Empty"], serde_json::json!({}));
/// ```
///
/// # Errors
///
/// Returns [`ClientError::XmlError`] if the document is malformed or has no
/// root element.
pub fn parse_xml(input: &[u8]) -> Result<Value, ClientError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Value> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ClientError::XmlError(e.to_string()))?;

        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                finish(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ClientError::XmlError(e.to_string()))?;
                append_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let data = data.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&data));
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ClientError::XmlError("unexpected closing tag".to_string())
                })?;
                finish(element, &mut stack, &mut root);
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ClientError::XmlError(
            "unexpected end of document".to_string(),
        ));
    }

    root.ok_or_else(|| ClientError::XmlError("document has no root element".to_string()))
}

fn append_text(stack: &mut [Element], text: &Cow<'_, str>) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

fn finish(element: Element, stack: &mut [Element], root: &mut Option<Value>) {
    let (name, value) = element.close();
    match stack.last_mut() {
        Some(parent) => parent.attach(name, value),
        None => *root = Some(value),
    }
}

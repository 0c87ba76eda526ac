//! Raw target-property values as handed over by the parser.
//!
//! An [`Element`] is the right-hand side of a `key: value` pair inside a
//! `target` declaration. It is untyped; `lfc-config` decides whether it
//! conforms to the type a property declares.

use serde::{Deserialize, Serialize};

use crate::time::{TimeUnit, TimeValue};

/// A raw target-property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// A literal as written, quotes included for strings: `"gcc"`, `42`, `true`.
    Literal(String),
    /// A bare identifier or path: `Debug`, `centralized`.
    Id(String),
    /// A number followed by an optional unit: `100 msec`, `0`.
    Time { magnitude: u64, unit: Option<TimeUnit> },
    /// `[a, b, c]`
    Array(Vec<Element>),
    /// `{ key: value, ... }`
    KeyValue(Vec<KeyValuePair>),
}

/// One `key: value` entry of a dictionary or of the target declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: Element,
}

impl KeyValuePair {
    pub fn new(name: impl Into<String>, value: Element) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Element {
    /// A quoted string literal.
    pub fn string(s: &str) -> Self {
        Element::Literal(format!("\"{s}\""))
    }

    pub fn literal(s: impl Into<String>) -> Self {
        Element::Literal(s.into())
    }

    pub fn id(s: impl Into<String>) -> Self {
        Element::Id(s.into())
    }

    pub fn time(magnitude: u64, unit: TimeUnit) -> Self {
        Element::Time {
            magnitude,
            unit: Some(unit),
        }
    }

    pub fn array(elements: impl IntoIterator<Item = Element>) -> Self {
        Element::Array(elements.into_iter().collect())
    }

    pub fn dict(pairs: impl IntoIterator<Item = (&'static str, Element)>) -> Self {
        Element::KeyValue(
            pairs
                .into_iter()
                .map(|(k, v)| KeyValuePair::new(k, v))
                .collect(),
        )
    }

    pub fn as_array(&self) -> Option<&[Element]> {
        match self {
            Element::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&[KeyValuePair]> {
        match self {
            Element::KeyValue(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Element::Literal(_))
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Element::Id(_))
    }

    /// Textual form: literals lose their surrounding quotes, times render
    /// as `<magnitude> <unit>`, composites render empty.
    pub fn to_text(&self) -> String {
        match self {
            Element::Literal(s) => without_quotes(s).to_string(),
            Element::Id(s) => s.clone(),
            Element::Time {
                magnitude,
                unit: Some(unit),
            } => format!("{magnitude} {unit}"),
            Element::Time {
                magnitude,
                unit: None,
            } => magnitude.to_string(),
            Element::Array(_) | Element::KeyValue(_) => String::new(),
        }
    }

    pub fn to_bool(&self) -> bool {
        self.to_text().eq_ignore_ascii_case("true")
    }

    /// Integer value using the `decode` grammar (see [`decode_integer`]).
    pub fn to_integer(&self) -> Option<i32> {
        decode_integer(&self.to_text())
    }

    /// Time value of a time element; the unitless zero reads as zero.
    pub fn to_time_value(&self) -> Option<TimeValue> {
        match self {
            Element::Time {
                magnitude,
                unit: Some(unit),
            } => Some(TimeValue::new(*magnitude, *unit)),
            Element::Time {
                magnitude: 0,
                unit: None,
            } => Some(TimeValue::ZERO),
            _ => None,
        }
    }

    /// A single string, or each element of an array, as text.
    pub fn to_list_of_strings(&self) -> Vec<String> {
        match self {
            Element::Array(items) => items.iter().map(Element::to_text).collect(),
            other => vec![other.to_text()],
        }
    }
}

fn without_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\''))) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse an integer the way `Integer.decode`-style grammars do: optional
/// sign, then `0x`/`0X`/`#` hexadecimal, a leading `0` for octal, or
/// decimal. The result must fit in an `i32`. Never panics.
pub fn decode_integer(text: &str) -> Option<i32> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
        .or_else(|| body.strip_prefix('#'))
    {
        (16, hex)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() || digits.starts_with(|c: char| c == '-' || c == '+') {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

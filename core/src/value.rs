//! Argument values, their type tags, and the service's wire encoding.
//!
//! # Design
//! A call's arguments are dynamic: the endpoint schema decides which names and
//! types are accepted, so values travel as the `Value` enum and are checked
//! against a `ValueType` set at call time. "Not supplied" is expressed by the
//! absence of a value (or a `None` positional slot), never by a falsy value,
//! so `0`, `""` and `false` reach the service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date format the service expects. The offset is always `+0000` because
/// timestamps are held in UTC.
const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
}

/// Type tag used in parameter schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Str,
    Bool,
    Timestamp,
    List,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Str => "str",
            ValueType::Bool => "bool",
            ValueType::Timestamp => "timestamp",
            ValueType::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Str(_) => ValueType::Str,
            Value::Bool(_) => ValueType::Bool,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::List(_) => ValueType::List,
        }
    }

    /// Text form of a scalar value; `None` for lists.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Timestamp(ts) => Some(format_timestamp(ts)),
            Value::List(_) => None,
        }
    }

    /// Append the encoded `(key, value)` pairs for `name` to `out`.
    ///
    /// Lists expand to one `name[]` entry per element, in order.
    pub fn encode_into(&self, name: &str, out: &mut Vec<(String, String)>) {
        match self {
            Value::List(items) => {
                let key = format!("{name}[]");
                out.extend(
                    items
                        .iter()
                        .filter_map(Value::scalar_text)
                        .map(|text| (key.clone(), text)),
                );
            }
            scalar => {
                if let Some(text) = scalar.scalar_text() {
                    out.push((name.to_string(), text));
                }
            }
        }
    }
}

/// Render a UTC timestamp in the service's date format.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// Arguments for one invocation: positional slots, keyword pairs, and extra
/// request headers.
///
/// ```
/// use posterous_core::Args;
///
/// let args = Args::new()
///     .arg(1)
///     .arg("Hello")
///     .arg("World")
///     .kw("media", vec!["a.jpg", "b.jpg"]);
/// assert_eq!(args.positional_len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Args {
    pub(crate) positional: Vec<Option<Value>>,
    pub(crate) keyword: Vec<(String, Value)>,
    pub(crate) headers: Vec<(String, String)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(Some(value.into()));
        self
    }

    /// Leave the next positional slot unfilled. The schema entry it lines up
    /// with may still be given by keyword.
    pub fn skip(mut self) -> Self {
        self.positional.push(None);
        self
    }

    /// Keyword argument.
    pub fn kw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Keyword argument that is only added when `value` is `Some`.
    pub fn kw_opt<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.kw(name, value),
            None => self,
        }
    }

    /// Extra header sent with this request only.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn encoded(name: &str, value: impl Into<Value>) -> Vec<(String, String)> {
        let mut out = Vec::new();
        value.into().encode_into(name, &mut out);
        out
    }

    #[test]
    fn booleans_encode_as_zero_or_one() {
        assert_eq!(encoded("private", true), vec![("private".into(), "1".into())]);
        assert_eq!(encoded("private", false), vec![("private".into(), "0".into())]);
    }

    #[test]
    fn lists_expand_to_bracketed_keys_in_order() {
        let out = encoded("media", vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(
            out,
            vec![
                ("media[]".to_string(), "a.jpg".to_string()),
                ("media[]".to_string(), "b.jpg".to_string()),
                ("media[]".to_string(), "c.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn empty_list_encodes_nothing() {
        assert!(encoded("media", Vec::<String>::new()).is_empty());
    }

    #[test]
    fn timestamp_uses_service_format_with_zero_offset() {
        let ts = Utc.with_ymd_and_hms(2010, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_timestamp(&ts), "Sun, 07 Mar 2010 09:05:02 +0000");
    }

    #[test]
    fn timestamp_drops_sub_second_precision() {
        let ts = Utc.with_ymd_and_hms(2011, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(format_timestamp(&ts), "Sat, 31 Dec 2011 23:59:59 +0000");
    }

    #[test]
    fn falsy_scalars_still_encode() {
        assert_eq!(encoded("page", 0), vec![("page".into(), "0".into())]);
        assert_eq!(encoded("tag", ""), vec![("tag".into(), "".into())]);
    }

    #[test]
    fn text_is_passed_through_as_utf8() {
        assert_eq!(
            encoded("title", "Grüße ☃"),
            vec![("title".into(), "Grüße ☃".into())]
        );
    }

    #[test]
    fn display_quotes_strings_and_brackets_lists() {
        let v = Value::from(vec![Value::from(1), Value::from("x")]);
        assert_eq!(v.to_string(), "[1, \"x\"]");
    }

    #[test]
    fn skipped_and_optional_arguments() {
        let args = Args::new()
            .skip()
            .arg("title")
            .kw_opt("body", None::<String>)
            .kw_opt("tags", Some("rust"));
        assert_eq!(args.positional, vec![None, Some(Value::from("title"))]);
        assert_eq!(args.keyword, vec![("tags".to_string(), Value::from("rust"))]);
    }

    #[test]
    fn args_deserialize_from_json() {
        let args: Args = serde_json::from_str(
            r#"{"positional":[{"int":1},null],"keyword":[["media",{"list":[{"str":"a"}]}]]}"#,
        )
        .unwrap();
        assert_eq!(args.positional, vec![Some(Value::Int(1)), None]);
        assert_eq!(
            args.keyword,
            vec![("media".to_string(), Value::List(vec![Value::from("a")]))]
        );
        assert!(args.headers.is_empty());
    }
}

//! Field values with deferred type inference.
//!
//! A [`Value`] read from input data keeps its original text and does not
//! know its type until something asks. The first call to [`Value::resolve`]
//! scans the text (see [`crate::infer`]) and caches the result, so a
//! million-row file where only two columns are touched only pays for
//! inference on those two columns. Untouched values are written back out
//! exactly as they were read: `007` stays `007`, `0xff` stays `0xff`.
//!
//! Values produced by computation have no original text; they render their
//! canonical form on output.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::fmt;

use crate::error::{PipelineError, Result};
use crate::infer;
use crate::record::Record;

/// Number of distinct [`TypeTag`]s; the dimension of the disposition tables.
pub const TYPE_COUNT: usize = 9;

/// Resolved type of a value.
///
/// The discriminants index the disposition tables in
/// [`crate::arithmetic`]; keep them dense and in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Error = 0,
    Absent = 1,
    Void = 2,
    String = 3,
    Int = 4,
    Float = 5,
    Bool = 6,
    Array = 7,
    Map = 8,
}

impl TypeTag {
    pub const ALL: [TypeTag; TYPE_COUNT] = [
        TypeTag::Error,
        TypeTag::Absent,
        TypeTag::Void,
        TypeTag::String,
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::Bool,
        TypeTag::Array,
        TypeTag::Map,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// User-visible type name, as returned by `typeof`.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Error => "error",
            TypeTag::Absent => "absent",
            TypeTag::Void => "empty",
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "boolean",
            TypeTag::Array => "array",
            TypeTag::Map => "map",
        }
    }
}

/// Resolved payload of a value.
///
/// `String` and `Void` carry no payload: their text is the value's original
/// text, which is always present for those kinds.
#[derive(Debug, Clone)]
pub enum Kind {
    Error,
    Absent,
    Void,
    String,
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<Value>),
    Map(Record),
}

impl Kind {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Kind::Error => TypeTag::Error,
            Kind::Absent => TypeTag::Absent,
            Kind::Void => TypeTag::Void,
            Kind::String => TypeTag::String,
            Kind::Int(_) => TypeTag::Int,
            Kind::Float(_) => TypeTag::Float,
            Kind::Bool(_) => TypeTag::Bool,
            Kind::Array(_) => TypeTag::Array,
            Kind::Map(_) => TypeTag::Map,
        }
    }
}

/// One scalar or collection cell.
#[derive(Clone)]
pub struct Value {
    text: Option<String>,
    kind: OnceCell<Kind>,
}

impl Value {
    /// A value from input data. Its type is inferred on first access.
    pub fn from_data(text: impl Into<String>) -> Self {
        Value {
            text: Some(text.into()),
            kind: OnceCell::new(),
        }
    }

    /// A value known to be a string; never type-inferred. Empty text is void.
    pub fn from_string(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.is_empty() {
            Kind::Void
        } else {
            Kind::String
        };
        Value {
            text: Some(text),
            kind: OnceCell::from(kind),
        }
    }

    /// A value whose text and type are both already known, such as a number
    /// literal in an expression.
    pub fn from_text_and_kind(text: impl Into<String>, kind: Kind) -> Self {
        Value {
            text: Some(text.into()),
            kind: OnceCell::from(kind),
        }
    }

    pub fn from_int(i: i64) -> Self {
        Self::computed(Kind::Int(i))
    }

    pub fn from_float(f: f64) -> Self {
        Self::computed(Kind::Float(f))
    }

    pub fn from_bool(b: bool) -> Self {
        Self::computed(Kind::Bool(b))
    }

    pub fn from_array(items: Vec<Value>) -> Self {
        Self::computed(Kind::Array(items))
    }

    pub fn from_map(map: Record) -> Self {
        Self::computed(Kind::Map(map))
    }

    pub fn void() -> Self {
        Self::from_string("")
    }

    pub fn absent() -> Self {
        Self::computed(Kind::Absent)
    }

    pub fn error() -> Self {
        Self::computed(Kind::Error)
    }

    fn computed(kind: Kind) -> Self {
        Value {
            text: None,
            kind: OnceCell::from(kind),
        }
    }

    /// Compute and memoize the type and payload. Idempotent.
    pub fn resolve(&self) -> &Kind {
        self.kind.get_or_init(|| match &self.text {
            Some(text) => infer::infer_kind(text, infer::inference_mode()),
            None => Kind::Absent,
        })
    }

    /// Whether type inference has not yet run for this value.
    pub fn is_pending(&self) -> bool {
        self.kind.get().is_none()
    }

    pub fn type_tag(&self) -> TypeTag {
        self.resolve().type_tag()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// The text this value was read from, if it came from input data or a
    /// string constructor.
    pub fn original(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.resolve(), Kind::Absent)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.resolve(), Kind::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.resolve(), Kind::Void)
    }

    /// Empty string or absent.
    pub fn is_empty(&self) -> bool {
        matches!(self.resolve(), Kind::Void | Kind::Absent)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.resolve(), Kind::Int(_) | Kind::Float(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.resolve() {
            Kind::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.resolve() {
            Kind::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Int or float, widened to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self.resolve() {
            Kind::Int(i) => Some(*i as f64),
            Kind::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.resolve() {
            Kind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String or void text.
    pub fn as_str(&self) -> Option<&str> {
        match self.resolve() {
            Kind::String | Kind::Void => self.text.as_deref(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self.resolve() {
            Kind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self.resolve() {
            Kind::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable access to a map payload.
    pub fn as_map_mut(&mut self) -> Option<&mut Record> {
        self.resolve();
        match self.kind.get_mut() {
            Some(Kind::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Int payload of a value already proven to be an int.
    ///
    /// # Panics
    ///
    /// On any other type: callers must have dispatched on the type first.
    pub fn int_value(&self) -> i64 {
        match self.resolve() {
            Kind::Int(i) => *i,
            other => panic!(
                "internal coding error: int_value on {} value",
                other.type_tag().name()
            ),
        }
    }

    /// Float payload of a value already proven to be a float.
    ///
    /// # Panics
    ///
    /// On any other type: callers must have dispatched on the type first.
    pub fn float_value(&self) -> f64 {
        match self.resolve() {
            Kind::Float(f) => *f,
            other => panic!(
                "internal coding error: float_value on {} value",
                other.type_tag().name()
            ),
        }
    }

    /// Output text, applying `ofmt` to computed floats.
    pub fn render(&self, ofmt: Option<&FloatFormat>) -> Cow<'_, str> {
        if let Some(text) = &self.text {
            return Cow::Borrowed(text);
        }
        match (self.resolve(), ofmt) {
            (Kind::Float(f), Some(fmt)) => Cow::Owned(fmt.format(*f)),
            _ => Cow::Owned(self.to_string()),
        }
    }

    /// Append this value as JSON. Numbers keep their original text.
    pub fn write_json(&self, out: &mut String) {
        match self.resolve() {
            Kind::Int(_) | Kind::Float(_) => out.push_str(&self.render(None)),
            Kind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Kind::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Kind::Map(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    push_json_string(out, key);
                    out.push_str(": ");
                    value.write_json(out);
                }
                out.push('}');
            }
            _ => push_json_string(out, &self.render(None)),
        }
    }
}

pub(crate) fn push_json_string(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::from(s).to_string());
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            return f.write_str(text);
        }
        match self.resolve() {
            Kind::Int(i) => write!(f, "{i}"),
            Kind::Float(x) => f.write_str(&format_float(*x)),
            Kind::Bool(b) => write!(f, "{b}"),
            Kind::Error => f.write_str("(error)"),
            Kind::Absent => f.write_str("(absent)"),
            Kind::Void | Kind::String => Ok(()),
            Kind::Array(_) | Kind::Map(_) => {
                let mut out = String::new();
                self.write_json(&mut out);
                f.write_str(&out)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.get() {
            None => write!(f, "Pending({:?})", self.text.as_deref().unwrap_or("")),
            Some(kind) => write!(f, "{}({})", kind.type_tag().name(), self),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.type_tag() == other.type_tag() && self.to_string() == other.to_string()
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::from_data(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::from_data(text)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::from_int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::from_float(f)
    }
}

/// Canonical text of a computed float: shortest round-trip decimal.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{f}")
    }
}

/// A printf-style float format from `--ofmt`: `%.6f`, `%.6lf`, `%.3e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatFormat {
    precision: usize,
    exponent: bool,
}

impl FloatFormat {
    pub fn parse(spec: &str) -> Result<Self> {
        let bad = || PipelineError::Usage(format!("unsupported --ofmt \"{spec}\""));
        let body = spec.strip_prefix("%.").ok_or_else(bad)?;
        let digits_end = body
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(bad)?;
        let precision: usize = body[..digits_end].parse().map_err(|_| bad())?;
        let exponent = match &body[digits_end..] {
            "f" | "lf" => false,
            "e" | "le" => true,
            _ => return Err(bad()),
        };
        Ok(FloatFormat {
            precision,
            exponent,
        })
    }

    pub fn format(&self, f: f64) -> String {
        if !f.is_finite() {
            format_float(f)
        } else if self.exponent {
            format!("{:.*e}", self.precision, f)
        } else {
            format!("{:.*}", self.precision, f)
        }
    }
}

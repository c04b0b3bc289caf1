//! Type inference from field text.
//!
//! Text is first classified by shape ([`scan`]) and then converted according
//! to the process-wide [`InferenceMode`]. The mode is installed once, before
//! any record is read, and never changes for the rest of the run.

use std::sync::OnceLock;

use crate::error::{PipelineError, Result};
use crate::value::Kind;

/// How field text is turned into typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Decimal, hex, binary and `0o` octal ints; floats; leading-zero
    /// decimals such as `007` stay strings.
    #[default]
    Normal,
    /// `-O`: leading-zero decimals are ints, read as octal when every digit
    /// allows it.
    LeadingZeroAsInt,
    /// `-A`: anything that would be an int is a float.
    IntAsFloat,
    /// `-S`: no inference at all.
    StringOnly,
}

static MODE: OnceLock<InferenceMode> = OnceLock::new();

/// Install the process-wide inference mode. Installing the same mode twice is
/// harmless; installing a different one after the first is an error.
pub fn install_inference_mode(mode: InferenceMode) -> Result<()> {
    match MODE.set(mode) {
        Ok(()) => Ok(()),
        Err(_) if MODE.get() == Some(&mode) => Ok(()),
        Err(_) => Err(PipelineError::Usage(format!(
            "inference mode is already {:?}; cannot switch to {mode:?}",
            inference_mode()
        ))),
    }
}

/// The installed inference mode, or [`InferenceMode::Normal`] if none was.
pub fn inference_mode() -> InferenceMode {
    MODE.get().copied().unwrap_or_default()
}

/// Shape of a piece of text, before any numeric conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    String,
    Decimal,
    /// All digits with a leading zero, some digit 8 or 9: `0089`.
    LeadingZeroDecimal,
    /// All digits with a leading zero, every digit 0-7: `0755`.
    LeadingZeroOctal,
    /// `0o17`
    Octal,
    /// `0xff`
    Hex,
    /// `0b1011`
    Binary,
    /// Might parse as a float; confirmed by the conversion.
    MaybeFloat,
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

fn strip_radix_prefix<'a>(body: &'a str, lower: &str, upper: &str) -> Option<&'a str> {
    body.strip_prefix(lower).or_else(|| body.strip_prefix(upper))
}

/// Classify text by shape.
pub fn scan(text: &str) -> Shape {
    let (_, body) = split_sign(text);
    if body.is_empty() {
        return Shape::String;
    }

    if let Some(digits) = strip_radix_prefix(body, "0x", "0X") {
        return if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            Shape::Hex
        } else {
            Shape::String
        };
    }
    if let Some(digits) = strip_radix_prefix(body, "0b", "0B") {
        return if !digits.is_empty() && digits.bytes().all(|b| b == b'0' || b == b'1') {
            Shape::Binary
        } else {
            Shape::String
        };
    }
    if let Some(digits) = strip_radix_prefix(body, "0o", "0O") {
        return if !digits.is_empty() && digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            Shape::Octal
        } else {
            Shape::String
        };
    }

    if body.bytes().all(|b| b.is_ascii_digit()) {
        if body.len() > 1 && body.starts_with('0') {
            if body.bytes().all(|b| b <= b'7') {
                return Shape::LeadingZeroOctal;
            }
            return Shape::LeadingZeroDecimal;
        }
        return Shape::Decimal;
    }

    let float_like = body.bytes().any(|b| b.is_ascii_digit())
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if float_like || matches!(body, "Inf" | "Infinity" | "NaN") {
        return Shape::MaybeFloat;
    }
    Shape::String
}

/// Infer the kind of a piece of field text under `mode`.
pub fn infer_kind(text: &str, mode: InferenceMode) -> Kind {
    if text.is_empty() {
        return Kind::Void;
    }
    match mode {
        InferenceMode::StringOnly => Kind::String,
        InferenceMode::Normal => infer_normal(text, scan(text)),
        InferenceMode::LeadingZeroAsInt => match scan(text) {
            Shape::LeadingZeroDecimal => parse_radix(text, 10),
            Shape::LeadingZeroOctal => parse_radix(text, 8),
            shape => infer_normal(text, shape),
        },
        InferenceMode::IntAsFloat => match infer_normal(text, scan(text)) {
            Kind::Int(i) => Kind::Float(i as f64),
            kind => kind,
        },
    }
}

fn infer_normal(text: &str, shape: Shape) -> Kind {
    match shape {
        Shape::String | Shape::LeadingZeroDecimal | Shape::LeadingZeroOctal => Kind::String,
        Shape::Decimal => match text.parse::<i64>() {
            Ok(i) => Kind::Int(i),
            // Out of int range: keep the magnitude as a float.
            Err(_) => parse_float(text),
        },
        Shape::Hex => parse_radix(text, 16),
        Shape::Binary => parse_radix(text, 2),
        Shape::Octal => parse_radix(text, 8),
        Shape::MaybeFloat => parse_float(text),
    }
}

fn parse_float(text: &str) -> Kind {
    match text.parse::<f64>() {
        Ok(f) => Kind::Float(f),
        Err(_) => Kind::String,
    }
}

/// Parse a signed int in `radix`, with or without its `0x`/`0b`/`0o` prefix.
///
/// Sixteen-digit hex values with the high bit set are read as two's
/// complement, so `0xffffffffffffffff` is -1.
fn parse_radix(text: &str, radix: u32) -> Kind {
    let (negative, body) = split_sign(text);
    let digits = match radix {
        16 => strip_radix_prefix(body, "0x", "0X"),
        2 => strip_radix_prefix(body, "0b", "0B"),
        8 => strip_radix_prefix(body, "0o", "0O"),
        _ => None,
    }
    .unwrap_or(body);

    let magnitude = if radix == 16 && digits.len() == 16 && digits.as_bytes()[0] >= b'8' {
        u64::from_str_radix(digits, 16).map(|u| u as i64).ok()
    } else {
        i64::from_str_radix(digits, radix).ok()
    };
    match magnitude {
        Some(i) if negative => Kind::Int(i.wrapping_neg()),
        Some(i) => Kind::Int(i),
        None => Kind::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(text: &str, mode: InferenceMode) -> Option<i64> {
        match infer_kind(text, mode) {
            Kind::Int(i) => Some(i),
            _ => None,
        }
    }

    fn float(text: &str, mode: InferenceMode) -> Option<f64> {
        match infer_kind(text, mode) {
            Kind::Float(f) => Some(f),
            _ => None,
        }
    }

    fn tag(text: &str, mode: InferenceMode) -> &'static str {
        infer_kind(text, mode).type_tag().name()
    }

    #[test]
    fn test_scan_shapes() {
        assert_eq!(scan("123"), Shape::Decimal);
        assert_eq!(scan("-123"), Shape::Decimal);
        assert_eq!(scan("0"), Shape::Decimal);
        assert_eq!(scan("0755"), Shape::LeadingZeroOctal);
        assert_eq!(scan("0089"), Shape::LeadingZeroDecimal);
        assert_eq!(scan("0xBeef"), Shape::Hex);
        assert_eq!(scan("0b1011"), Shape::Binary);
        assert_eq!(scan("0o17"), Shape::Octal);
        assert_eq!(scan("1.5e-3"), Shape::MaybeFloat);
        assert_eq!(scan(".5"), Shape::MaybeFloat);
        assert_eq!(scan("-Inf"), Shape::MaybeFloat);
        assert_eq!(scan("0xg"), Shape::String);
        assert_eq!(scan("abc"), Shape::String);
        assert_eq!(scan("-"), Shape::String);
    }

    #[test]
    fn test_normal_mode() {
        let m = InferenceMode::Normal;
        assert_eq!(int("42", m), Some(42));
        assert_eq!(int("-42", m), Some(-42));
        assert_eq!(int("+7", m), Some(7));
        assert_eq!(int("0xff", m), Some(255));
        assert_eq!(int("-0xff", m), Some(-255));
        assert_eq!(int("0b101", m), Some(5));
        assert_eq!(int("0o17", m), Some(15));
        assert_eq!(float("1.5", m), Some(1.5));
        assert_eq!(float("1e3", m), Some(1000.0));
        assert_eq!(tag("007", m), "string");
        assert_eq!(tag("0089", m), "string");
        assert_eq!(tag("1-2", m), "string");
        assert_eq!(tag("hello", m), "string");
        assert_eq!(tag("", m), "empty");
    }

    #[test]
    fn test_hex_twos_complement() {
        let m = InferenceMode::Normal;
        assert_eq!(int("0xffffffffffffffff", m), Some(-1));
        assert_eq!(int("0x8000000000000000", m), Some(i64::MIN));
        assert_eq!(int("0x7fffffffffffffff", m), Some(i64::MAX));
        assert_eq!(tag("0x1ffffffffffffffff", m), "string");
    }

    #[test]
    fn test_decimal_overflow_becomes_float() {
        assert_eq!(
            float("99999999999999999999", InferenceMode::Normal),
            Some(1e20)
        );
    }

    #[test]
    fn test_leading_zero_as_int_mode() {
        let m = InferenceMode::LeadingZeroAsInt;
        assert_eq!(int("0755", m), Some(0o755));
        assert_eq!(int("010", m), Some(8));
        assert_eq!(int("0089", m), Some(89));
        assert_eq!(int("-007", m), Some(-7));
        assert_eq!(int("12", m), Some(12));
    }

    #[test]
    fn test_int_as_float_mode() {
        let m = InferenceMode::IntAsFloat;
        assert_eq!(float("3", m), Some(3.0));
        assert_eq!(float("0xff", m), Some(255.0));
        assert_eq!(float("2.5", m), Some(2.5));
        assert_eq!(tag("007", m), "string");
    }

    #[test]
    fn test_string_only_mode() {
        let m = InferenceMode::StringOnly;
        assert_eq!(tag("3", m), "string");
        assert_eq!(tag("1.5", m), "string");
        assert_eq!(tag("", m), "empty");
    }

    #[test]
    fn test_default_mode_is_normal() {
        // Unit tests never install a mode.
        assert_eq!(inference_mode(), InferenceMode::Normal);
    }
}

//! Built-in functions callable from expressions.
//!
//! Arity is checked when the program is parsed; type mismatches at run time
//! produce error values rather than failing the stream.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::arithmetic::{Collation, collate};
use crate::record::Record;
use crate::value::{Kind, Value};

/// Mutable state shared by function calls: the random source and compiled
/// regexes.
pub struct Runtime {
    rng: StdRng,
    regexes: HashMap<String, Option<Regex>>,
}

impl Runtime {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Runtime {
            rng,
            regexes: HashMap::new(),
        }
    }

    /// Compile `pattern` once; `None` if it is not a valid regex.
    ///
    /// A pattern written as `"..."i` is matched case-insensitively.
    pub fn regex(&mut self, pattern: &str) -> Option<&Regex> {
        self.regexes
            .entry(pattern.to_string())
            .or_insert_with(|| compile_regex(pattern).ok())
            .as_ref()
    }
}

/// Compile a user-supplied regex. `"..."i` means case-insensitive.
pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    match pattern.strip_suffix("\"i").and_then(|p| p.strip_prefix('"')) {
        Some(inner) => Regex::new(&format!("(?i){inner}")),
        None => Regex::new(pattern),
    }
}

/// Allowed argument counts, as `(min, max)`; `None` max means variadic.
fn arity(name: &str) -> Option<(usize, Option<usize>)> {
    let exact = |n| Some((n, Some(n)));
    match name {
        "urand" => exact(0),
        "strlen" | "toupper" | "tolower" | "capitalize" | "lstrip" | "rstrip" | "strip"
        | "clean_whitespace" | "collapse_whitespace" | "strrev" | "hexfmt" | "length"
        | "typeof" | "is_absent" | "is_present" | "is_empty" | "is_not_empty"
        | "is_string" | "is_numeric" | "is_int" | "is_float" | "is_map" | "is_array"
        | "is_error" | "is_boolean" | "abs" | "ceiling" | "floor" | "round" | "sqrt"
        | "exp" | "expm1" | "log" | "log10" | "log1p" | "sgn" | "int" | "float"
        | "string" | "boolean" => exact(1),
        "truncate" | "regextract" | "fmtnum" | "splitax" | "splitnv" | "joink" | "joinv"
        | "haskey" | "roundm" | "urandint" => exact(2),
        "sub" | "gsub" | "ssub" | "regextract_or_else" => exact(3),
        "mapsum" | "mapdiff" | "min" | "max" => Some((0, None)),
        "mapexcept" | "mapselect" => Some((1, None)),
        _ => None,
    }
}

/// Check a call site against the function table.
pub fn check_arity(name: &str, given: usize) -> Result<(), String> {
    let Some((min, max)) = arity(name) else {
        return Err(format!("function \"{name}\" not found"));
    };
    let ok = given >= min && max.is_none_or(|max| given <= max);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("{min}"),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    };
    Err(format!(
        "function \"{name}\" takes {expected} argument{}, got {given}",
        if expected == "1" { "" } else { "s" }
    ))
}

/// Evaluate a call whose arity has already been checked.
pub fn call(name: &str, args: &[Value], rt: &mut Runtime) -> Value {
    match name {
        "strlen" => with_text(&args[0], |s| Value::from_int(s.chars().count() as i64)),
        "toupper" => map_string(&args[0], |s| s.to_uppercase()),
        "tolower" => map_string(&args[0], |s| s.to_lowercase()),
        "capitalize" => map_string(&args[0], |s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }),
        "lstrip" => map_string(&args[0], |s| s.trim_start().to_string()),
        "rstrip" => map_string(&args[0], |s| s.trim_end().to_string()),
        "strip" => map_string(&args[0], |s| s.trim().to_string()),
        "collapse_whitespace" => map_string(&args[0], collapse_whitespace),
        "clean_whitespace" => map_string(&args[0], |s| collapse_whitespace(s.trim())),
        "strrev" => with_text(&args[0], |s| Value::from_string(s.chars().rev().collect::<String>())),
        "truncate" => truncate(&args[0], &args[1]),
        "sub" => substitute(&args[0], &args[1], &args[2], rt, false),
        "gsub" => substitute(&args[0], &args[1], &args[2], rt, true),
        "ssub" => ssub(&args[0], &args[1], &args[2]),
        "regextract" => regextract(&args[0], &args[1], rt).unwrap_or_else(Value::error),
        "regextract_or_else" => {
            regextract(&args[0], &args[1], rt).unwrap_or_else(|| args[2].clone())
        }
        "fmtnum" => fmtnum(&args[0], &args[1]),
        "hexfmt" => match args[0].resolve() {
            Kind::Int(i) => Value::from_string(format!("0x{:x}", *i as u64)),
            _ => args[0].clone(),
        },
        "splitax" => split(&args[0], &args[1], |parts| {
            Value::from_array(parts.map(Value::from_string).collect())
        }),
        "splitnv" => split(&args[0], &args[1], |parts| {
            Value::from_map(
                parts
                    .enumerate()
                    .map(|(i, p)| ((i + 1).to_string(), Value::from_data(p)))
                    .collect(),
            )
        }),
        "joink" => join(&args[0], &args[1], true),
        "joinv" => join(&args[0], &args[1], false),
        "length" => match args[0].resolve() {
            Kind::Absent | Kind::Error => Value::from_int(0),
            Kind::Array(items) => Value::from_int(items.len() as i64),
            Kind::Map(map) => Value::from_int(map.len() as i64),
            _ => Value::from_int(1),
        },
        "haskey" => haskey(&args[0], &args[1]),
        "mapsum" => map_fold(args, |acc, other| {
            for (k, v) in other {
                acc.put(k, v.clone());
            }
        }),
        "mapdiff" => map_fold(args, |acc, other| {
            for k in other.keys() {
                acc.remove(k);
            }
        }),
        "mapexcept" => map_select(args, false),
        "mapselect" => map_select(args, true),
        "typeof" => Value::from_string(args[0].type_name()),
        "is_absent" => Value::from_bool(args[0].is_absent()),
        "is_present" => Value::from_bool(!args[0].is_absent()),
        "is_empty" => Value::from_bool(args[0].is_void()),
        "is_not_empty" => Value::from_bool(!args[0].is_empty() && !args[0].is_error()),
        "is_string" => Value::from_bool(matches!(args[0].resolve(), Kind::String | Kind::Void)),
        "is_numeric" => Value::from_bool(args[0].is_numeric()),
        "is_int" => Value::from_bool(matches!(args[0].resolve(), Kind::Int(_))),
        "is_float" => Value::from_bool(matches!(args[0].resolve(), Kind::Float(_))),
        "is_map" => Value::from_bool(matches!(args[0].resolve(), Kind::Map(_))),
        "is_array" => Value::from_bool(matches!(args[0].resolve(), Kind::Array(_))),
        "is_error" => Value::from_bool(args[0].is_error()),
        "is_boolean" => Value::from_bool(matches!(args[0].resolve(), Kind::Bool(_))),
        "abs" => int_preserving(&args[0], i64::wrapping_abs, f64::abs),
        "ceiling" => int_preserving(&args[0], |i| i, f64::ceil),
        "floor" => int_preserving(&args[0], |i| i, f64::floor),
        "round" => int_preserving(&args[0], |i| i, f64::round),
        "sgn" => int_preserving(&args[0], i64::signum, |f| {
            if f == 0.0 || f.is_nan() { f } else { f.signum() }
        }),
        "sqrt" => float_math(&args[0], f64::sqrt),
        "exp" => float_math(&args[0], f64::exp),
        "expm1" => float_math(&args[0], f64::exp_m1),
        "log" => float_math(&args[0], f64::ln),
        "log10" => float_math(&args[0], f64::log10),
        "log1p" => float_math(&args[0], f64::ln_1p),
        "roundm" => roundm(&args[0], &args[1]),
        "min" => extremum(args, false),
        "max" => extremum(args, true),
        "int" => to_int(&args[0]),
        "float" => match args[0].resolve() {
            Kind::Int(i) => Value::from_float(*i as f64),
            Kind::Float(_) | Kind::Absent | Kind::Void => args[0].clone(),
            Kind::Bool(b) => Value::from_float(if *b { 1.0 } else { 0.0 }),
            _ => Value::error(),
        },
        "string" => match args[0].resolve() {
            Kind::Absent => Value::absent(),
            _ => Value::from_string(args[0].to_string()),
        },
        "boolean" => match args[0].resolve() {
            Kind::Bool(_) | Kind::Absent | Kind::Void => args[0].clone(),
            Kind::Int(i) => Value::from_bool(*i != 0),
            Kind::Float(f) => Value::from_bool(*f != 0.0),
            Kind::String => match args[0].as_str() {
                Some("true") => Value::from_bool(true),
                Some("false") => Value::from_bool(false),
                _ => Value::error(),
            },
            _ => Value::error(),
        },
        "urand" => Value::from_float(rt.rng.random::<f64>()),
        "urandint" => match (args[0].as_int(), args[1].as_int()) {
            (Some(lo), Some(hi)) => {
                let (lo, hi) = (lo.min(hi), lo.max(hi));
                Value::from_int(rt.rng.random_range(lo..=hi))
            }
            _ => Value::error(),
        },
        _ => Value::error(),
    }
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Text of a scalar; `None` for absent, error and collections.
fn scalar_text(v: &Value) -> Option<String> {
    match v.resolve() {
        Kind::Absent | Kind::Error | Kind::Array(_) | Kind::Map(_) => None,
        _ => Some(v.to_string()),
    }
}

/// Absent and error pass through; collections are an error.
fn passthrough(v: &Value) -> Value {
    match v.resolve() {
        Kind::Absent => Value::absent(),
        _ => Value::error(),
    }
}

fn with_text(v: &Value, f: impl FnOnce(&str) -> Value) -> Value {
    match scalar_text(v) {
        Some(text) => f(&text),
        None => passthrough(v),
    }
}

/// Apply `f` to strings; other types come back unchanged.
fn map_string(v: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match v.as_str() {
        Some(s) => Value::from_string(f(s)),
        None => v.clone(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn truncate(v: &Value, length: &Value) -> Value {
    let Some(n) = length.as_int().filter(|n| *n >= 0) else {
        return Value::error();
    };
    let Some(text) = scalar_text(v) else {
        return passthrough(v);
    };
    if text.chars().count() <= n as usize {
        return v.clone();
    }
    Value::from_string(text.chars().take(n as usize).collect::<String>())
}

/// `\1` through `\9` in a replacement become regex capture references.
pub(crate) fn capture_references(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('\\', Some(d)) if d.is_ascii_digit() => {
                out.push_str(&format!("${{{d}}}"));
                chars.next();
            }
            ('$', _) => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

fn substitute(v: &Value, pattern: &Value, replacement: &Value, rt: &mut Runtime, all: bool) -> Value {
    for arg in [v, pattern, replacement] {
        if arg.is_absent() || arg.is_error() {
            return arg.clone();
        }
    }
    let (Some(text), Some(pattern), Some(replacement)) =
        (scalar_text(v), scalar_text(pattern), scalar_text(replacement))
    else {
        return Value::error();
    };
    let Some(re) = rt.regex(&pattern) else {
        return Value::error();
    };
    let replacement = capture_references(&replacement);
    let out = if all {
        re.replace_all(&text, replacement.as_str())
    } else {
        re.replace(&text, replacement.as_str())
    };
    Value::from_string(out.into_owned())
}

fn ssub(v: &Value, find: &Value, replacement: &Value) -> Value {
    for arg in [v, find, replacement] {
        if arg.is_absent() || arg.is_error() {
            return arg.clone();
        }
    }
    match (scalar_text(v), scalar_text(find), scalar_text(replacement)) {
        (Some(text), Some(find), Some(replacement)) => {
            Value::from_string(text.replacen(&find, &replacement, 1))
        }
        _ => Value::error(),
    }
}

fn regextract(v: &Value, pattern: &Value, rt: &mut Runtime) -> Option<Value> {
    let text = scalar_text(v)?;
    let pattern = scalar_text(pattern)?;
    let found = rt.regex(&pattern)?.find(&text)?;
    Some(Value::from_string(found.as_str()))
}

/// printf-style formatting of one number: `%d`, `%x`, `%o`, `%b`, `%f`,
/// `%e`, `%g`, `%s`, with optional flags, width, precision and `l`/`ll`.
fn fmtnum(v: &Value, format: &Value) -> Value {
    let Some(format) = format.as_str() else {
        return Value::error();
    };
    if v.is_absent() {
        return Value::absent();
    }
    if !v.is_numeric() {
        return Value::error();
    }
    match format_number(format, v) {
        Some(text) => Value::from_data(text),
        None => Value::error(),
    }
}

pub(crate) fn format_number(format: &str, v: &Value) -> Option<String> {
    let start = format.find('%')?;
    let (prefix, spec) = format.split_at(start);
    let mut chars = spec[1..].char_indices().peekable();

    let (mut left, mut zero, mut plus) = (false, false, false);
    while let Some(&(_, c)) = chars.peek() {
        match c {
            '-' => left = true,
            '0' => zero = true,
            '+' => plus = true,
            _ => break,
        }
        chars.next();
    }
    let mut width = 0usize;
    while let Some(&(_, c)) = chars.peek().filter(|(_, c)| c.is_ascii_digit()) {
        width = width * 10 + c.to_digit(10)? as usize;
        chars.next();
    }
    let mut precision = None;
    if chars.peek().is_some_and(|&(_, c)| c == '.') {
        chars.next();
        let mut p = 0usize;
        while let Some(&(_, c)) = chars.peek().filter(|(_, c)| c.is_ascii_digit()) {
            p = p * 10 + c.to_digit(10)? as usize;
            chars.next();
        }
        precision = Some(p);
    }
    while chars.peek().is_some_and(|&(_, c)| c == 'l') {
        chars.next();
    }
    let (at, conversion) = chars.next()?;
    let suffix = &spec[1 + at + conversion.len_utf8()..];

    let float = v.as_number()?;
    let int = v.as_int().unwrap_or(float as i64);
    let mut body = match conversion {
        'd' | 'i' => int.to_string(),
        'x' => format!("{:x}", int as u64),
        'X' => format!("{:X}", int as u64),
        'o' => format!("{:o}", int as u64),
        'b' => format!("{:b}", int as u64),
        'f' | 'F' => format!("{:.*}", precision.unwrap_or(6), float),
        'e' | 'E' => {
            let text = c_exponent(&format!("{:.*e}", precision.unwrap_or(6), float));
            if conversion == 'E' { text.to_uppercase() } else { text }
        }
        'g' | 'G' => match precision {
            Some(p) => format!("{:.*}", p, float),
            None => crate::value::format_float(float),
        },
        's' => v.to_string(),
        _ => return None,
    };
    if plus && !body.starts_with('-') && conversion != 's' {
        body.insert(0, '+');
    }
    let len = body.chars().count();
    if len < width {
        let fill = width - len;
        if left {
            body.extend(std::iter::repeat_n(' ', fill));
        } else if zero && conversion != 's' {
            let sign = usize::from(body.starts_with(['-', '+']));
            body.insert_str(sign, &"0".repeat(fill));
        } else {
            body.insert_str(0, &" ".repeat(fill));
        }
    }
    Some(format!("{prefix}{body}{suffix}"))
}

/// Rust writes `1.5e3`; C writes `1.5e+03`.
fn c_exponent(text: &str) -> String {
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text.to_string();
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

fn split(v: &Value, separator: &Value, build: impl FnOnce(&mut dyn Iterator<Item = &str>) -> Value) -> Value {
    let (Some(text), Some(separator)) = (scalar_text(v), separator.as_str()) else {
        return passthrough(v);
    };
    if text.is_empty() {
        return build(&mut std::iter::empty());
    }
    if separator.is_empty() {
        return build(&mut std::iter::once(text.as_str()));
    }
    build(&mut text.split(separator))
}

fn join(v: &Value, separator: &Value, keys: bool) -> Value {
    let Some(separator) = separator.as_str() else {
        return Value::error();
    };
    let parts: Vec<String> = match v.resolve() {
        Kind::Map(map) if keys => map.keys().map(str::to_string).collect(),
        Kind::Map(map) => map.values().map(Value::to_string).collect(),
        Kind::Array(items) if keys => (1..=items.len()).map(|i| i.to_string()).collect(),
        Kind::Array(items) => items.iter().map(Value::to_string).collect(),
        _ => return passthrough(v),
    };
    Value::from_string(parts.join(separator))
}

/// 1-up array position, negative counting from the end.
pub(crate) fn array_position(len: usize, index: i64) -> Option<usize> {
    let back = usize::try_from(index.unsigned_abs()).ok()?;
    match index {
        i if i >= 1 && back <= len => Some(back - 1),
        i if i < 0 && back <= len => Some(len - back),
        _ => None,
    }
}

fn haskey(v: &Value, key: &Value) -> Value {
    match v.resolve() {
        Kind::Map(map) => match key.resolve() {
            Kind::String | Kind::Int(_) => Value::from_bool(map.has(&key.to_string())),
            _ => Value::error(),
        },
        Kind::Array(items) => match key.as_int() {
            Some(i) => Value::from_bool(array_position(items.len(), i).is_some()),
            None => Value::from_bool(false),
        },
        _ => Value::from_bool(false),
    }
}

fn map_fold(args: &[Value], mut combine: impl FnMut(&mut Record, &Record)) -> Value {
    let Some((first, rest)) = args.split_first() else {
        return Value::from_map(Record::new());
    };
    let Some(first) = first.as_map() else {
        return Value::error();
    };
    let mut acc = first.clone();
    for other in rest {
        let Some(other) = other.as_map() else {
            return Value::error();
        };
        combine(&mut acc, other);
    }
    Value::from_map(acc)
}

fn map_select(args: &[Value], keep: bool) -> Value {
    let Some(map) = args[0].as_map() else {
        return Value::error();
    };
    let mut names = Vec::new();
    for arg in &args[1..] {
        match arg.resolve() {
            Kind::Array(items) => names.extend(items.iter().map(Value::to_string)),
            Kind::String | Kind::Int(_) => names.push(arg.to_string()),
            _ => return Value::error(),
        }
    }
    let mut out = map.clone();
    out.retain(|k, _| names.iter().any(|n| n == k) == keep);
    Value::from_map(out)
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

/// Non-numeric inputs: absent and void pass through, anything else is an
/// error.
fn non_numeric(v: &Value) -> Value {
    match v.resolve() {
        Kind::Absent | Kind::Void => v.clone(),
        _ => Value::error(),
    }
}

fn int_preserving(v: &Value, on_int: impl FnOnce(i64) -> i64, on_float: impl FnOnce(f64) -> f64) -> Value {
    match v.resolve() {
        Kind::Int(i) => Value::from_int(on_int(*i)),
        Kind::Float(f) => Value::from_float(on_float(*f)),
        _ => non_numeric(v),
    }
}

fn float_math(v: &Value, f: impl FnOnce(f64) -> f64) -> Value {
    match v.as_number() {
        Some(x) => Value::from_float(f(x)),
        None => non_numeric(v),
    }
}

fn roundm(v: &Value, m: &Value) -> Value {
    match (v.resolve(), m.resolve()) {
        (Kind::Int(x), Kind::Int(m)) if *m != 0 => {
            Value::from_int(((*x as f64 / *m as f64).round() as i64).wrapping_mul(*m))
        }
        _ => match (v.as_number(), m.as_number()) {
            (Some(x), Some(m)) => Value::from_float((x / m).round() * m),
            _ => non_numeric(v),
        },
    }
}

fn to_int(v: &Value) -> Value {
    match v.resolve() {
        Kind::Int(_) | Kind::Absent | Kind::Void => v.clone(),
        Kind::Float(f) => Value::from_int(f.trunc() as i64),
        Kind::Bool(b) => Value::from_int(i64::from(*b)),
        _ => Value::error(),
    }
}

/// Ordering rank across types: numbers < booleans < voids < strings.
fn rank(v: &Value) -> Option<u8> {
    match v.resolve() {
        Kind::Int(_) | Kind::Float(_) => Some(1),
        Kind::Bool(_) => Some(2),
        Kind::Void => Some(3),
        Kind::String => Some(4),
        _ => None,
    }
}

fn extremum(args: &[Value], want_max: bool) -> Value {
    let mut best: Option<&Value> = None;
    for v in args {
        if v.is_absent() {
            continue;
        }
        if v.is_error() || rank(v).is_none() {
            return Value::error();
        }
        let Some(current) = best else {
            best = Some(v);
            continue;
        };
        let ordering = match rank(v).cmp(&rank(current)) {
            std::cmp::Ordering::Equal => match (v.resolve(), current.resolve()) {
                (Kind::Bool(a), Kind::Bool(b)) => a.cmp(b),
                _ => match collate(v, current) {
                    Collation::Ordered(o) => o,
                    _ => std::cmp::Ordering::Equal,
                },
            },
            other => other,
        };
        let better = if want_max {
            ordering.is_gt()
        } else {
            ordering.is_lt()
        };
        if better {
            best = Some(v);
        }
    }
    match best {
        Some(v) => v.clone(),
        None => Value::absent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rt() -> Runtime {
        Runtime::new(Some(1))
    }

    fn s(text: &str) -> Value {
        Value::from_string(text)
    }

    fn d(text: &str) -> Value {
        Value::from_data(text)
    }

    fn call1(name: &str, args: &[Value]) -> String {
        call(name, args, &mut rt()).to_string()
    }

    #[test]
    fn test_check_arity() {
        assert!(check_arity("strlen", 1).is_ok());
        assert!(check_arity("min", 0).is_ok());
        assert!(check_arity("mapexcept", 3).is_ok());
        assert_eq!(
            check_arity("strlen", 2).unwrap_err(),
            "function \"strlen\" takes 1 argument, got 2"
        );
        assert_eq!(
            check_arity("sub", 1).unwrap_err(),
            "function \"sub\" takes 3 arguments, got 1"
        );
        assert!(check_arity("nosuch", 0).is_err());
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call1("strlen", &[s("héllo")]), "5");
        assert_eq!(call1("toupper", &[s("abc")]), "ABC");
        assert_eq!(call1("toupper", &[d("17")]), "17");
        assert_eq!(call1("capitalize", &[s("abc")]), "Abc");
        assert_eq!(call1("clean_whitespace", &[s("  a   b  ")]), "a b");
        assert_eq!(call1("collapse_whitespace", &[s(" a   b ")]), " a b ");
        assert_eq!(call1("truncate", &[s("abcdef"), Value::from_int(3)]), "abc");
        assert_eq!(call1("truncate", &[s("ab"), Value::from_int(3)]), "ab");
        assert_eq!(call1("strrev", &[s("abc")]), "cba");
        assert!(call("strlen", &[Value::absent()], &mut rt()).is_absent());
    }

    #[test]
    fn test_regex_functions() {
        assert_eq!(call1("sub", &[s("abcabc"), s("b"), s("X")]), "aXcabc");
        assert_eq!(call1("gsub", &[s("abcabc"), s("b"), s("X")]), "aXcaXc");
        assert_eq!(call1("sub", &[s("ab.c"), s("(a)(b)"), s("<\\2\\1>")]), "<ba>.c");
        assert_eq!(call1("gsub", &[s("a.b.c"), s("\\."), s("$")]), "a$b$c");
        assert_eq!(call1("ssub", &[s("a.b.c"), s("."), s("")]), "ab.c");
        assert_eq!(call1("sub", &[s("ABC"), s("\"b\"i"), s("x")]), "AxC");
        assert_eq!(call1("regextract", &[s("abc123def"), s("[0-9]+")]), "123");
        assert!(call("regextract", &[s("abc"), s("[0-9]+")], &mut rt()).is_error());
        assert_eq!(call1("regextract_or_else", &[s("abc"), s("[0-9]+"), s("no")]), "no");
        assert!(call("sub", &[s("abc"), s("("), s("x")], &mut rt()).is_error());
    }

    #[test]
    fn test_fmtnum() {
        assert_eq!(call1("fmtnum", &[Value::from_float(3.14159), s("%.2f")]), "3.14");
        assert_eq!(call1("fmtnum", &[Value::from_float(3.14159), s("%.3lf")]), "3.142");
        assert_eq!(call1("fmtnum", &[Value::from_int(17), s("%08.3lf")]), "0017.000");
        assert_eq!(call1("fmtnum", &[Value::from_int(17), s("%x")]), "11");
        assert_eq!(call1("fmtnum", &[Value::from_int(17), s("[%5d]")]), "[   17]");
        assert_eq!(call1("fmtnum", &[Value::from_int(17), s("%-5d|")]), "17   |");
        assert_eq!(call1("fmtnum", &[Value::from_float(3.7), s("%d")]), "3");
        assert_eq!(call1("fmtnum", &[Value::from_float(1500.0), s("%.2e")]), "1.50e+03");
        assert!(call("fmtnum", &[s("abc"), s("%d")], &mut rt()).is_error());
        assert_eq!(call1("hexfmt", &[Value::from_int(255)]), "0xff");
        assert_eq!(call1("hexfmt", &[Value::from_int(-1)]), "0xffffffffffffffff");
    }

    #[test]
    fn test_collection_functions() {
        assert_eq!(call1("splitax", &[s("3,4,5"), s(",")]), r#"["3", "4", "5"]"#);
        assert_eq!(call1("splitnv", &[s("3,x"), s(",")]), r#"{"1": 3, "2": "x"}"#);
        let map = call("splitnv", &[s("a,b"), s(",")], &mut rt());
        assert_eq!(call1("joink", &[map.clone(), s(";")]), "1;2");
        assert_eq!(call1("joinv", &[map.clone(), s(";")]), "a;b");
        assert_eq!(call1("length", &[map.clone()]), "2");
        assert_eq!(call1("length", &[Value::absent()]), "0");
        assert_eq!(call1("length", &[s("x")]), "1");
        assert_eq!(call1("haskey", &[map.clone(), Value::from_int(2)]), "true");
        assert_eq!(call1("haskey", &[map.clone(), s("3")]), "false");
        let array = call("splitax", &[s("a,b"), s(",")], &mut rt());
        assert_eq!(call1("haskey", &[array.clone(), Value::from_int(-2)]), "true");
        assert_eq!(call1("haskey", &[array, Value::from_int(3)]), "false");
    }

    #[test]
    fn test_map_functions() {
        let a = call("splitnv", &[s("x,y,z"), s(",")], &mut rt());
        let b = call("splitnv", &[s("q"), s(",")], &mut rt());
        assert_eq!(call1("mapsum", &[a.clone(), b.clone()]), r#"{"1": "q", "2": "y", "3": "z"}"#);
        assert_eq!(call1("mapdiff", &[a.clone(), b]), r#"{"2": "y", "3": "z"}"#);
        assert_eq!(call1("mapexcept", &[a.clone(), s("1"), Value::from_int(3)]), r#"{"2": "y"}"#);
        assert_eq!(call1("mapselect", &[a, s("1")]), r#"{"1": "x"}"#);
        assert_eq!(call1("mapsum", &[]), "{}");
    }

    #[test]
    fn test_type_predicates() {
        assert_eq!(call1("typeof", &[d("0xff")]), "int");
        assert_eq!(call1("typeof", &[d("")]), "empty");
        assert_eq!(call1("typeof", &[Value::absent()]), "absent");
        assert_eq!(call1("is_empty", &[d("")]), "true");
        assert_eq!(call1("is_not_empty", &[d("")]), "false");
        assert_eq!(call1("is_not_empty", &[d("x")]), "true");
        assert_eq!(call1("is_string", &[d("abc")]), "true");
        assert_eq!(call1("is_numeric", &[d("1.5")]), "true");
        assert_eq!(call1("is_present", &[Value::absent()]), "false");
    }

    #[test]
    fn test_math() {
        assert_eq!(call1("abs", &[Value::from_int(-3)]), "3");
        assert_eq!(call1("ceiling", &[Value::from_float(1.2)]), "2");
        assert_eq!(call1("floor", &[Value::from_float(-1.2)]), "-2");
        assert_eq!(call1("round", &[Value::from_float(2.5)]), "3");
        assert_eq!(call1("roundm", &[Value::from_int(7), Value::from_int(5)]), "5");
        assert_eq!(call1("sgn", &[Value::from_float(-0.5)]), "-1");
        assert_eq!(call1("sqrt", &[Value::from_int(16)]), "4");
        assert_eq!(call1("exp", &[Value::from_int(0)]), "1");
        assert!(call("sqrt", &[s("x")], &mut rt()).is_error());
        assert!(call("sqrt", &[d("")], &mut rt()).is_void());
    }

    #[test]
    fn test_min_max() {
        let args = [Value::from_int(3), Value::from_float(1.5), Value::absent()];
        assert_eq!(call1("min", &args), "1.5");
        assert_eq!(call1("max", &args), "3");
        assert_eq!(call1("max", &[Value::from_int(3), s("abc")]), "abc");
        assert_eq!(call1("min", &[Value::from_int(3), s("abc")]), "3");
        assert_eq!(call1("max", &[Value::from_bool(true), Value::from_int(7)]), "true");
        assert!(call("max", &[], &mut rt()).is_absent());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call1("int", &[Value::from_float(3.7)]), "3");
        assert_eq!(call1("int", &[Value::from_float(-3.7)]), "-3");
        assert_eq!(call1("float", &[Value::from_int(3)]), "3");
        assert_eq!(call1("string", &[Value::from_int(3)]), "3");
        assert_eq!(
            call("string", &[Value::from_int(3)], &mut rt()).type_name(),
            "string"
        );
        assert_eq!(call1("boolean", &[s("true")]), "true");
        assert_eq!(call1("boolean", &[Value::from_int(0)]), "false");
    }

    #[test]
    fn test_array_position() {
        assert_eq!(array_position(3, 1), Some(0));
        assert_eq!(array_position(3, 3), Some(2));
        assert_eq!(array_position(3, -1), Some(2));
        assert_eq!(array_position(3, -3), Some(0));
        assert_eq!(array_position(3, 0), None);
        assert_eq!(array_position(3, 4), None);
        assert_eq!(array_position(3, -4), None);
        assert_eq!(array_position(3, i64::MIN), None);
        assert_eq!(array_position(3, i64::MAX), None);
    }

    #[test]
    fn test_random_is_seeded() {
        let mut a = Runtime::new(Some(7));
        let mut b = Runtime::new(Some(7));
        let draws_a: Vec<String> = (0..5).map(|_| call("urand", &[], &mut a).to_string()).collect();
        let draws_b: Vec<String> = (0..5).map(|_| call("urand", &[], &mut b).to_string()).collect();
        assert_eq!(draws_a, draws_b);
        let n = call("urandint", &[Value::from_int(1), Value::from_int(3)], &mut a);
        assert!((1..=3).contains(&n.as_int().unwrap()));
    }
}

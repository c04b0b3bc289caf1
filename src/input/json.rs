use std::io::BufRead;

use serde_json::Value as JsonValue;

use crate::error::{PipelineError, Result};
use crate::input::RecordReader;
use crate::record::Record;
use crate::value::Value;

/// A stream of JSON objects, or of arrays of objects.
///
/// Scalars become data values (numbers keep their text, strings are
/// type-inferred like any other field), `null` becomes empty, nested
/// objects become maps and arrays become arrays.
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        JsonReader
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

fn convert(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::void(),
        JsonValue::Bool(b) => Value::from_bool(b),
        JsonValue::Number(n) => Value::from_data(n.to_string()),
        JsonValue::String(s) => Value::from_data(s),
        JsonValue::Array(items) => Value::from_array(items.into_iter().map(convert).collect()),
        JsonValue::Object(map) => Value::from_map(to_record(map)),
    }
}

fn to_record(map: serde_json::Map<String, JsonValue>) -> Record {
    map.into_iter().map(|(k, v)| (k, convert(v))).collect()
}

impl RecordReader for JsonReader {
    fn read_stream(
        &mut self,
        input: &mut dyn BufRead,
        filename: &str,
        emit: &mut dyn FnMut(Record) -> bool,
    ) -> Result<()> {
        let parse_error = |line: u64, message: String| PipelineError::Parse {
            filename: filename.to_string(),
            line,
            message,
        };
        let stream = serde_json::Deserializer::from_reader(input).into_iter::<JsonValue>();
        for item in stream {
            let item = item.map_err(|e| parse_error(e.line() as u64, e.to_string()))?;
            match item {
                JsonValue::Object(map) => {
                    if !emit(to_record(map)) {
                        return Ok(());
                    }
                }
                JsonValue::Array(items) => {
                    for element in items {
                        let JsonValue::Object(map) = element else {
                            return Err(parse_error(
                                0,
                                "array elements must be objects".to_string(),
                            ));
                        };
                        if !emit(to_record(map)) {
                            return Ok(());
                        }
                    }
                }
                other => {
                    return Err(parse_error(
                        0,
                        format!("expected an object or array of objects, got {other}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        JsonReader::new().read_stream(&mut text.as_bytes(), "test.json", &mut |r| {
            out.push(r);
            true
        })?;
        Ok(out)
    }

    #[test]
    fn test_object_stream_and_arrays() {
        let records = read(r#"{"a": 1, "b": "x"} [{"a": 2}, {"a": 3}]"#).unwrap();
        let lines: Vec<String> = records.iter().map(Record::to_string).collect();
        assert_eq!(lines, vec!["a=1,b=x", "a=2", "a=3"]);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let records = read(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        assert_eq!(records[0].joined_keys(), "z,a,m");
    }

    #[test]
    fn test_value_conversion() {
        let records = read(r#"{"n": null, "t": true, "s": "0xff", "m": {"x": [1, 2]}}"#).unwrap();
        let r = &records[0];
        assert!(r.get("n").is_some_and(Value::is_void));
        assert_eq!(r.get("t").and_then(Value::as_bool), Some(true));
        assert_eq!(r.get("s").and_then(Value::as_int), Some(255));
        assert_eq!(r.get("m").map(|v| v.to_string()), Some(r#"{"x": [1, 2]}"#.into()));
    }

    #[test]
    fn test_scalar_at_top_level_is_an_error() {
        assert!(read("3").is_err());
        assert!(read(r#"{"a": "#).is_err());
    }
}

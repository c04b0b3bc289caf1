use std::io::{self, Write};

use crate::output::RecordWriter;
use crate::record::Record;
use crate::value::{FloatFormat, Kind, push_json_string};

/// A JSON array of objects, one key per line.
pub struct JsonWriter {
    ofmt: Option<FloatFormat>,
    wrote_any: bool,
}

impl JsonWriter {
    pub fn new(ofmt: Option<FloatFormat>) -> Self {
        JsonWriter {
            ofmt,
            wrote_any: false,
        }
    }
}

impl RecordWriter for JsonWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        let mut text = String::new();
        text.push_str(if self.wrote_any { ",\n" } else { "[\n" });
        text.push('{');
        for (n, (key, value)) in record.iter().enumerate() {
            text.push_str(if n > 0 { ",\n  " } else { "\n  " });
            push_json_string(&mut text, key);
            text.push_str(": ");
            match (value.resolve(), &self.ofmt) {
                (Kind::Float(_), Some(_)) if value.original().is_none() => {
                    text.push_str(&value.render(self.ofmt.as_ref()));
                }
                _ => value.write_json(&mut text),
            }
        }
        if !record.is_empty() {
            text.push('\n');
        }
        text.push('}');
        self.wrote_any = true;
        out.write_all(text.as_bytes())
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if self.wrote_any {
            out.write_all(b"\n]\n")
        } else {
            out.write_all(b"[\n]\n")
        }
    }
}

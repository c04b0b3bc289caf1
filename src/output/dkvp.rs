use std::io::{self, Write};

use crate::output::RecordWriter;
use crate::record::Record;
use crate::value::FloatFormat;

/// `key=value` pairs joined by the field separator.
pub struct DkvpWriter {
    ofs: String,
    ops: String,
    ofmt: Option<FloatFormat>,
}

impl DkvpWriter {
    pub fn new(ofs: &str, ops: &str, ofmt: Option<FloatFormat>) -> Self {
        DkvpWriter {
            ofs: ofs.to_string(),
            ops: ops.to_string(),
            ofmt,
        }
    }
}

impl RecordWriter for DkvpWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        let mut line = String::new();
        for (n, (key, value)) in record.iter().enumerate() {
            if n > 0 {
                line.push_str(&self.ofs);
            }
            line.push_str(key);
            line.push_str(&self.ops);
            line.push_str(&value.render(self.ofmt.as_ref()));
        }
        line.push('\n');
        out.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_write_with_separators() {
        let record: Record = [("a", Value::from_data("1")), ("b", Value::from_float(0.5))]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        DkvpWriter::new(";", ":", None).write(&record, &mut out).unwrap();
        assert_eq!(out, b"a:1;b:0.5\n");
    }

    #[test]
    fn test_empty_record_is_blank_line() {
        let mut out = Vec::new();
        DkvpWriter::new(",", "=", None).write(&Record::new(), &mut out).unwrap();
        assert_eq!(out, b"\n");
    }
}

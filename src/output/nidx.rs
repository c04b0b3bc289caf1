use std::io::{self, Write};

use crate::output::RecordWriter;
use crate::record::Record;
use crate::value::FloatFormat;

/// Values only, joined by the field separator.
pub struct NidxWriter {
    ofs: String,
    ofmt: Option<FloatFormat>,
}

impl NidxWriter {
    pub fn new(ofs: &str, ofmt: Option<FloatFormat>) -> Self {
        NidxWriter {
            ofs: ofs.to_string(),
            ofmt,
        }
    }
}

impl RecordWriter for NidxWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        let values: Vec<_> = record.values().map(|v| v.render(self.ofmt.as_ref())).collect();
        writeln!(out, "{}", values.join(&self.ofs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_values_only() {
        let record: Record = [("a", Value::from_data("x")), ("b", Value::from_data("y"))]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        NidxWriter::new(" ", None).write(&record, &mut out).unwrap();
        assert_eq!(out, b"x y\n");
    }
}

use std::io::{self, Write};

use crate::output::RecordWriter;
use crate::record::Record;
use crate::value::FloatFormat;

/// Header-plus-rows CSV. When the key set changes a blank line and a new
/// header are written.
pub struct CsvLiteWriter {
    ofs: String,
    ofmt: Option<FloatFormat>,
    last_header: Option<String>,
}

impl CsvLiteWriter {
    pub fn new(ofs: &str, ofmt: Option<FloatFormat>) -> Self {
        CsvLiteWriter {
            ofs: ofs.to_string(),
            ofmt,
            last_header: None,
        }
    }

    fn quote(&self, field: &str) -> String {
        let needs_quotes = field.contains(self.ofs.as_str())
            || field.contains('"')
            || field.contains('\n')
            || field.starts_with(' ')
            || field.ends_with(' ');
        if needs_quotes {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn join<'a>(&self, fields: impl Iterator<Item = std::borrow::Cow<'a, str>>) -> String {
        fields
            .map(|f| self.quote(&f))
            .collect::<Vec<_>>()
            .join(&self.ofs)
    }
}

impl RecordWriter for CsvLiteWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        let header = record.joined_keys();
        if self.last_header.as_deref() != Some(header.as_str()) {
            if self.last_header.is_some() {
                writeln!(out)?;
            }
            let keys = self.join(record.keys().map(std::borrow::Cow::Borrowed));
            writeln!(out, "{keys}")?;
            self.last_header = Some(header);
        }
        let values = self.join(record.values().map(|v| v.render(self.ofmt.as_ref())));
        writeln!(out, "{values}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (*k, Value::from_data(*v))).collect()
    }

    #[test]
    fn test_header_repeats_on_schema_change() {
        let mut writer = CsvLiteWriter::new(",", None);
        let mut out = Vec::new();
        writer.write(&rec(&[("a", "1"), ("b", "2")]), &mut out).unwrap();
        writer.write(&rec(&[("a", "3"), ("b", "4")]), &mut out).unwrap();
        writer.write(&rec(&[("c", "5")]), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a,b\n1,2\n3,4\n\nc\n5\n"
        );
    }

    #[test]
    fn test_quoting() {
        let mut writer = CsvLiteWriter::new(",", None);
        let mut out = Vec::new();
        writer
            .write(&rec(&[("a", "x,y"), ("b", "say \"hi\"")]), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a,b\n\"x,y\",\"say \"\"hi\"\"\"\n"
        );
    }
}

use std::io::BufRead;

use crate::error::{PipelineError, Result};
use crate::input::{RecordReader, next_line};
use crate::record::Record;
use crate::value::Value;

/// Vertical records: one `key value` pair per line, records separated by
/// one or more blank lines. Runs of the pair separator count as one.
pub struct XtabReader {
    ips: String,
}

impl XtabReader {
    pub fn new(ips: &str) -> Self {
        XtabReader {
            ips: ips.to_string(),
        }
    }

    fn split<'a>(&self, line: &'a str) -> (&'a str, &'a str) {
        let sep = self.ips.as_str();
        match line.split_once(sep) {
            Some((key, mut rest)) => {
                while let Some(stripped) = rest.strip_prefix(sep) {
                    rest = stripped;
                }
                (key, rest)
            }
            None => (line, ""),
        }
    }
}

impl RecordReader for XtabReader {
    fn read_stream(
        &mut self,
        input: &mut dyn BufRead,
        filename: &str,
        emit: &mut dyn FnMut(Record) -> bool,
    ) -> Result<()> {
        let mut record = Record::new();
        let mut line = String::new();
        let mut line_number = 0u64;
        while next_line(input, filename, &mut line)? {
            line_number += 1;
            if line.is_empty() {
                if !record.is_empty() && !emit(std::mem::take(&mut record)) {
                    return Ok(());
                }
                continue;
            }
            let (key, value) = self.split(&line);
            if key.is_empty() {
                return Err(PipelineError::Parse {
                    filename: filename.to_string(),
                    line: line_number,
                    message: "empty key".to_string(),
                });
            }
            record.put(key, Value::from_data(value));
        }
        if !record.is_empty() {
            emit(record);
        }
        Ok(())
    }
}

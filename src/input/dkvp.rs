use std::io::BufRead;

use crate::error::Result;
use crate::input::{RecordReader, next_line};
use crate::record::Record;
use crate::value::Value;

/// Delimited key-value pairs: `a=1,b=2,c=3`.
///
/// A pair with no pair separator is keyed by its 1-up position. Empty
/// lines are skipped.
pub struct DkvpReader {
    ifs: String,
    ips: String,
}

impl DkvpReader {
    pub fn new(ifs: &str, ips: &str) -> Self {
        DkvpReader {
            ifs: ifs.to_string(),
            ips: ips.to_string(),
        }
    }

    pub fn parse_line(&self, line: &str) -> Record {
        let mut record = Record::new();
        for (n, pair) in line.split(self.ifs.as_str()).enumerate() {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once(self.ips.as_str()) {
                Some((key, value)) => record.put(key, Value::from_data(value)),
                None => record.put((n + 1).to_string(), Value::from_data(pair)),
            }
        }
        record
    }
}

impl RecordReader for DkvpReader {
    fn read_stream(
        &mut self,
        input: &mut dyn BufRead,
        filename: &str,
        emit: &mut dyn FnMut(Record) -> bool,
    ) -> Result<()> {
        let mut line = String::new();
        while next_line(input, filename, &mut line)? {
            if line.is_empty() {
                continue;
            }
            if !emit(self.parse_line(&line)) {
                break;
            }
        }
        Ok(())
    }
}

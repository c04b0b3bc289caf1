use std::io::BufRead;

use crate::error::Result;
use crate::input::{RecordReader, next_line};
use crate::record::Record;
use crate::value::Value;

/// Implicitly-numbered values: `pan 1 0.34` becomes `1=pan,2=1,3=0.34`.
/// Runs of the separator count as one.
pub struct NidxReader {
    ifs: String,
}

impl NidxReader {
    pub fn new(ifs: &str) -> Self {
        NidxReader {
            ifs: ifs.to_string(),
        }
    }

    pub fn parse_line(&self, line: &str) -> Record {
        line.split(self.ifs.as_str())
            .filter(|field| !field.is_empty())
            .enumerate()
            .map(|(n, field)| ((n + 1).to_string(), Value::from_data(field)))
            .collect()
    }
}

impl RecordReader for NidxReader {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_separators_collapse() {
        let reader = NidxReader::new(" ");
        assert_eq!(
            reader.parse_line("  pan   1 0.34 ").to_string(),
            "1=pan,2=1,3=0.34"
        );
    }

    #[test]
    fn test_custom_separator() {
        let reader = NidxReader::new("|");
        assert_eq!(reader.parse_line("a||b|c").joined_keys(), "1,2,3");
    }
}

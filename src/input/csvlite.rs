use std::io::BufRead;

use crate::error::{PipelineError, Result};
use crate::input::{RecordReader, next_line};
use crate::record::Record;
use crate::value::Value;

/// Header-plus-rows input: CSV, TSV and PPRINT.
///
/// A blank line ends the current block; the next line is a new header. In
/// CSV a field wrapped in double quotes may contain the separator, and `""`
/// inside it is a literal quote. Quoted fields are strings and are never
/// type-inferred. A data row whose length differs from its header's is an
/// error.
pub struct CsvLiteReader {
    ifs: String,
    dialect: Dialect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Csv,
    /// No quoting; `\t`, `\n` and `\\` in a field are unescaped.
    Tsv,
    /// No quoting; runs of the separator count as one and a lone `-` is an
    /// empty value. Barred tables are accepted.
    Pprint,
}

/// One split field and whether it was quoted.
type Field = (String, bool);

impl CsvLiteReader {
    pub fn new(ifs: &str) -> Self {
        CsvLiteReader {
            ifs: ifs.to_string(),
            dialect: Dialect::Csv,
        }
    }

    pub fn tsv(ifs: &str) -> Self {
        CsvLiteReader {
            ifs: ifs.to_string(),
            dialect: Dialect::Tsv,
        }
    }

    pub fn pprint(ifs: &str) -> Self {
        CsvLiteReader {
            ifs: ifs.to_string(),
            dialect: Dialect::Pprint,
        }
    }

    fn split(&self, line: &str) -> Vec<Field> {
        let sep = self.ifs.as_str();
        match self.dialect {
            Dialect::Csv => {}
            Dialect::Tsv => {
                return line.split(sep).map(|f| (unescape_tsv(f), false)).collect();
            }
            Dialect::Pprint => {
                let barred = line.trim_start().starts_with('|');
                return line
                    .split(sep)
                    .filter(|f| !f.is_empty() && !(barred && *f == "|"))
                    .map(|f| match f {
                        "-" => (String::new(), false),
                        f => (f.to_string(), false),
                    })
                    .collect();
            }
        }
        let mut fields = Vec::new();
        let mut rest = line;
        loop {
            if let Some(quoted) = rest.strip_prefix('"') {
                let mut text = String::new();
                let mut chars = quoted.char_indices().peekable();
                let mut end = quoted.len();
                while let Some((i, c)) = chars.next() {
                    if c == '"' {
                        if matches!(chars.peek(), Some((_, '"'))) {
                            text.push('"');
                            chars.next();
                        } else {
                            end = i + 1;
                            break;
                        }
                    } else {
                        text.push(c);
                    }
                }
                fields.push((text, true));
                let after = &quoted[end..];
                match after.find(sep) {
                    Some(pos) => rest = &after[pos + sep.len()..],
                    None => return fields,
                }
            } else {
                match rest.find(sep) {
                    Some(pos) => {
                        fields.push((rest[..pos].to_string(), false));
                        rest = &rest[pos + sep.len()..];
                    }
                    None => {
                        fields.push((rest.to_string(), false));
                        return fields;
                    }
                }
            }
        }
    }
}

impl RecordReader for CsvLiteReader {
    fn read_stream(
        &mut self,
        input: &mut dyn BufRead,
        filename: &str,
        emit: &mut dyn FnMut(Record) -> bool,
    ) -> Result<()> {
        let mut header: Option<Vec<String>> = None;
        let mut line = String::new();
        let mut line_number = 0u64;
        while next_line(input, filename, &mut line)? {
            line_number += 1;
            if self.dialect == Dialect::Pprint {
                let trimmed = line.trim_matches(|c: char| self.ifs.contains(c));
                if trimmed.starts_with('+') {
                    continue;
                }
                if trimmed.is_empty() {
                    header = None;
                    continue;
                }
            }
            if line.is_empty() {
                header = None;
                continue;
            }
            let fields = self.split(&line);
            let Some(keys) = &header else {
                header = Some(fields.into_iter().map(|(text, _)| text).collect());
                continue;
            };
            if fields.len() != keys.len() {
                return Err(PipelineError::Parse {
                    filename: filename.to_string(),
                    line: line_number,
                    message: format!(
                        "data length {} does not match header length {}",
                        fields.len(),
                        keys.len()
                    ),
                });
            }
            let record: Record = keys
                .iter()
                .zip(fields)
                .map(|(key, (text, quoted))| {
                    let value = if quoted {
                        Value::from_string(text)
                    } else {
                        Value::from_data(text)
                    };
                    (key.as_str(), value)
                })
                .collect();
            if !emit(record) {
                break;
            }
        }
        Ok(())
    }
}

fn unescape_tsv(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

use std::io::{self, Write};

use crate::output::{RecordWriter, pad};
use crate::record::Record;
use crate::value::FloatFormat;

/// Column-aligned blocks. Records are held until the key set changes or
/// the stream ends, since column widths depend on every row of the block.
/// Empty values print as `-`.
pub struct PprintWriter {
    ofs: String,
    ofmt: Option<FloatFormat>,
    schema: Option<String>,
    keys: Vec<String>,
    rows: Vec<Vec<String>>,
    blocks_written: usize,
}

impl PprintWriter {
    pub fn new(ofs: &str, ofmt: Option<FloatFormat>) -> Self {
        PprintWriter {
            ofs: ofs.to_string(),
            ofmt,
            schema: None,
            keys: Vec::new(),
            rows: Vec::new(),
            blocks_written: 0,
        }
    }

    fn flush_block(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        if self.blocks_written > 0 {
            writeln!(out)?;
        }
        let mut widths: Vec<usize> = self.keys.iter().map(|k| k.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let render = |cells: &[String]| {
            let last = cells.len().saturating_sub(1);
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, &w))| if i == last { cell.clone() } else { pad(cell, w) })
                .collect::<Vec<_>>()
                .join(&self.ofs)
        };
        writeln!(out, "{}", render(&self.keys))?;
        for row in &self.rows {
            writeln!(out, "{}", render(row))?;
        }
        self.rows.clear();
        self.blocks_written += 1;
        Ok(())
    }
}

fn cell(text: &str) -> String {
    if text.is_empty() {
        "-".to_string()
    } else {
        text.to_string()
    }
}

impl RecordWriter for PprintWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        if record.is_empty() {
            return Ok(());
        }
        let schema = record.joined_keys();
        if self.schema.as_deref() != Some(schema.as_str()) {
            self.flush_block(out)?;
            self.keys = record.keys().map(cell).collect();
            self.schema = Some(schema);
        }
        let row = record
            .values()
            .map(|v| cell(&v.render(self.ofmt.as_ref())))
            .collect();
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.flush_block(out)
    }
}

//! Record writers and the sink thread that drives them.

mod csvlite;
mod dkvp;
mod json;
mod nidx;
mod pprint;

pub use csvlite::CsvLiteWriter;
pub use dkvp::DkvpWriter;
pub use json::JsonWriter;
pub use nidx::NidxWriter;
pub use pprint::PprintWriter;

use std::io::{self, Write};

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::context::{Batch, Context, Envelope};
use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::value::FloatFormat;

/// Format-specific encoding of records.
pub trait RecordWriter: Send {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> io::Result<()>;

    /// Emit anything deferred. Called once, at end of stream.
    fn finish(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// Output format names accepted by `-o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dkvp,
    Nidx,
    Csv,
    Json,
    Pprint,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "dkvp" => Ok(OutputFormat::Dkvp),
            "nidx" => Ok(OutputFormat::Nidx),
            "csv" | "csvlite" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "pprint" => Ok(OutputFormat::Pprint),
            other => Err(PipelineError::Usage(format!(
                "unknown output format \"{other}\""
            ))),
        }
    }

    /// Build a writer, with optional separator overrides and float format.
    pub fn writer(
        self,
        ofs: Option<&str>,
        ops: Option<&str>,
        ofmt: Option<FloatFormat>,
    ) -> Box<dyn RecordWriter> {
        match self {
            OutputFormat::Dkvp => Box::new(DkvpWriter::new(
                ofs.unwrap_or(","),
                ops.unwrap_or("="),
                ofmt,
            )),
            OutputFormat::Nidx => Box::new(NidxWriter::new(ofs.unwrap_or(" "), ofmt)),
            OutputFormat::Csv => Box::new(CsvLiteWriter::new(ofs.unwrap_or(","), ofmt)),
            OutputFormat::Json => Box::new(JsonWriter::new(ofmt)),
            OutputFormat::Pprint => Box::new(PprintWriter::new(ofs.unwrap_or(" "), ofmt)),
        }
    }
}

/// The three one-shot signals a sink can raise.
pub struct SinkSignals {
    pub fatal: Sender<PipelineError>,
    pub data: Sender<PipelineError>,
    pub done: Sender<()>,
}

/// Sink settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkOptions {
    /// Treat an error-valued field as fatal.
    pub fail_on_data_error: bool,
}

fn data_error(record: &Record, ctx: &Context) -> Option<PipelineError> {
    let (field, value) = record.iter().find(|(_, v)| v.is_error())?;
    Some(PipelineError::Data {
        nr: ctx.nr,
        fnr: ctx.fnr,
        filename: ctx.filename.to_string(),
        field: field.to_string(),
        text: value.to_string(),
    })
}

/// Consume batches until end of stream, writing each record and text line.
///
/// On end of stream the writer's deferred output is emitted and `out` is
/// flushed before `done` is signalled. A write failure is sent on `fatal`,
/// an error-valued field under `fail_on_data_error` on `data`; either way
/// the sink stops without signalling `done`. On every path, whatever was
/// written is flushed before the sink returns the output stream.
pub fn run_sink<W: Write>(
    input: Receiver<Batch>,
    mut writer: Box<dyn RecordWriter>,
    mut out: W,
    options: SinkOptions,
    signals: SinkSignals,
) -> W {
    let mut data_failure = None;
    let outcome = (|| -> std::result::Result<bool, PipelineError> {
        for batch in input.iter() {
            for envelope in batch {
                match envelope {
                    Envelope::Record(record, ctx) => {
                        if options.fail_on_data_error {
                            if let Some(e) = data_error(&record, &ctx) {
                                data_failure = Some(e);
                                return Ok(false);
                            }
                        }
                        writer.write(&record, &mut out).map_err(PipelineError::Write)?;
                    }
                    Envelope::Text(text, _) => {
                        writeln!(out, "{text}").map_err(PipelineError::Write)?;
                    }
                    Envelope::EndOfStream(ctx) => {
                        writer.finish(&mut out).map_err(PipelineError::Write)?;
                        out.flush().map_err(PipelineError::Write)?;
                        debug!(nr = ctx.nr, "sink reached end of stream");
                        return Ok(true);
                    }
                }
            }
        }
        debug!("sink input disconnected before end of stream");
        Ok(false)
    })();

    if !matches!(outcome, Ok(true)) {
        if let Err(e) = out.flush() {
            debug!(error = %e, "flushing partial output failed");
        }
    }
    match outcome {
        Ok(true) => {
            let _ = signals.done.try_send(());
        }
        Ok(false) => {
            if let Some(e) = data_failure {
                let _ = signals.data.try_send(e);
            }
        }
        Err(e) => {
            let _ = signals.fatal.try_send(e);
        }
    }
    out
}

/// Left-justify `text` in `width` columns.
pub(crate) fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut padded = String::with_capacity(width.max(len));
    padded.push_str(text);
    padded.extend(std::iter::repeat_n(' ', width.saturating_sub(len)));
    padded
}

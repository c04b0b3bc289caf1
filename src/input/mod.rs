//! Record sources.
//!
//! A [`Source`] runs on its own thread and feeds the first stage of the
//! chain with batches of record envelopes, ending with a batch that holds
//! the single end-of-stream envelope. Between batches it polls the
//! cancellation channel and stops reading once downstream has asked it to.

mod csvlite;
mod dkvp;
mod json;
mod nidx;
mod xtab;

pub use csvlite::CsvLiteReader;
pub use dkvp::DkvpReader;
pub use json::JsonReader;
pub use nidx::NidxReader;
pub use xtab::XtabReader;

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::context::{Batch, Context, Envelope};
use crate::error::{PipelineError, Result};
use crate::record::Record;

/// Format-specific decoding of one input stream into records.
pub trait RecordReader: Send {
    /// Decode every record in `input`, handing each to `emit`. Stops early,
    /// without error, when `emit` returns `false`.
    fn read_stream(
        &mut self,
        input: &mut dyn BufRead,
        filename: &str,
        emit: &mut dyn FnMut(Record) -> bool,
    ) -> Result<()>;
}

/// Producer of the envelope stream.
pub trait Source: Send {
    /// Read `names` in order (standard input when empty), sending batches to
    /// `out`. A fatal error is sent once on `errors` and ends the read with
    /// no end-of-stream envelope.
    fn read(
        &mut self,
        names: &[String],
        context: Context,
        out: &Sender<Batch>,
        errors: &Sender<PipelineError>,
        cancel: &Receiver<()>,
    );
}

/// Input format names accepted by `-i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Dkvp,
    Nidx,
    Csv,
    Tsv,
    Json,
    Pprint,
    Xtab,
}

impl InputFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "dkvp" => Ok(InputFormat::Dkvp),
            "nidx" => Ok(InputFormat::Nidx),
            "csv" | "csvlite" => Ok(InputFormat::Csv),
            "tsv" => Ok(InputFormat::Tsv),
            "json" => Ok(InputFormat::Json),
            "pprint" => Ok(InputFormat::Pprint),
            "xtab" => Ok(InputFormat::Xtab),
            other => Err(PipelineError::Usage(format!(
                "unknown input format \"{other}\""
            ))),
        }
    }

    /// Build a reader, with optional field and pair separator overrides.
    pub fn reader(self, ifs: Option<&str>, ips: Option<&str>) -> Box<dyn RecordReader> {
        match self {
            InputFormat::Dkvp => Box::new(DkvpReader::new(ifs.unwrap_or(","), ips.unwrap_or("="))),
            InputFormat::Nidx => Box::new(NidxReader::new(ifs.unwrap_or(" "))),
            InputFormat::Csv => Box::new(CsvLiteReader::new(ifs.unwrap_or(","))),
            InputFormat::Tsv => Box::new(CsvLiteReader::tsv(ifs.unwrap_or("\t"))),
            InputFormat::Json => Box::new(JsonReader::new()),
            InputFormat::Pprint => Box::new(CsvLiteReader::pprint(ifs.unwrap_or(" "))),
            InputFormat::Xtab => Box::new(XtabReader::new(ips.unwrap_or(" "))),
        }
    }
}

/// Groups records into batches, assigns contexts, and honors cancellation.
pub struct Batcher<'a> {
    out: &'a Sender<Batch>,
    cancel: &'a Receiver<()>,
    batch: Batch,
    batch_size: usize,
    context: Context,
    progress_every: Option<u64>,
    stopped: bool,
}

impl<'a> Batcher<'a> {
    pub fn new(
        out: &'a Sender<Batch>,
        cancel: &'a Receiver<()>,
        context: Context,
        batch_size: usize,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Batcher {
            out,
            cancel,
            batch: Vec::with_capacity(batch_size.min(4096)),
            batch_size,
            context,
            progress_every: None,
            stopped: false,
        }
    }

    /// Log progress at `info` every `n` records.
    pub fn with_progress(mut self, n: Option<u64>) -> Self {
        self.progress_every = n.filter(|&n| n > 0);
        self
    }

    pub fn start_file(&mut self, filename: &str) {
        self.context.start_file(filename);
    }

    /// Whether reading should stop: downstream cancelled or disappeared.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Queue one record. Returns `false` once reading should stop.
    pub fn push(&mut self, record: Record) -> bool {
        if self.stopped {
            return false;
        }
        let ctx = self.context.advance();
        if let Some(every) = self.progress_every {
            if ctx.nr % every == 0 {
                info!(nr = ctx.nr, filename = &*ctx.filename, "records read");
            }
        }
        self.batch.push(Envelope::Record(record, ctx));
        if self.batch.len() >= self.batch_size {
            if self.cancel.try_recv().is_ok() {
                debug!(nr = self.context.nr, "source cancelled by downstream");
                self.stopped = true;
            }
            let batch = std::mem::take(&mut self.batch);
            if self.out.send(batch).is_err() {
                debug!("first stage gone; source stopping");
                self.stopped = true;
            }
        }
        !self.stopped
    }

    /// Send the final batch with the end-of-stream envelope.
    pub fn finish(mut self) {
        self.batch.push(Envelope::EndOfStream(self.context.clone()));
        let batch = std::mem::take(&mut self.batch);
        if self.out.send(batch).is_err() {
            debug!("first stage gone before end of stream");
        }
    }

    /// After a fatal error: send the records read so far, with no
    /// end-of-stream envelope.
    pub fn abandon(mut self) {
        if self.batch.is_empty() || self.stopped {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        if self.out.send(batch).is_err() {
            debug!("first stage gone; dropping partial batch");
        }
    }
}

/// A source decoding files (or standard input) with a [`RecordReader`].
pub struct ReaderSource {
    reader: Box<dyn RecordReader>,
    batch_size: usize,
    progress_every: Option<u64>,
}

impl ReaderSource {
    pub fn new(reader: Box<dyn RecordReader>, batch_size: usize) -> Self {
        ReaderSource {
            reader,
            batch_size,
            progress_every: None,
        }
    }

    pub fn with_progress(mut self, every: Option<u64>) -> Self {
        self.progress_every = every;
        self
    }

    fn read_all(&mut self, names: &[String], batcher: &mut Batcher<'_>) -> Result<()> {
        if names.is_empty() {
            batcher.start_file("(stdin)");
            let stdin = io::stdin();
            let mut input = stdin.lock();
            return self
                .reader
                .read_stream(&mut input, "(stdin)", &mut |r| batcher.push(r));
        }
        for name in names {
            let file = File::open(name).map_err(|source| PipelineError::Open {
                path: name.clone(),
                source,
            })?;
            debug!(filename = name.as_str(), "reading");
            batcher.start_file(name);
            let mut input = BufReader::new(file);
            self.reader
                .read_stream(&mut input, name, &mut |r| batcher.push(r))?;
            if batcher.is_stopped() {
                break;
            }
        }
        Ok(())
    }
}

impl Source for ReaderSource {
    fn read(
        &mut self,
        names: &[String],
        context: Context,
        out: &Sender<Batch>,
        errors: &Sender<PipelineError>,
        cancel: &Receiver<()>,
    ) {
        let mut batcher =
            Batcher::new(out, cancel, context, self.batch_size).with_progress(self.progress_every);
        match self.read_all(names, &mut batcher) {
            Ok(()) => batcher.finish(),
            Err(e) => {
                batcher.abandon();
                if let Err(e) = errors.try_send(e) {
                    debug!(error = %e.into_inner(), "fatal input error not reported");
                }
            }
        }
    }
}

/// A source over records already in memory. Ignores file names.
pub struct MemorySource {
    records: Vec<Record>,
    batch_size: usize,
    filename: String,
}

impl MemorySource {
    pub fn new(records: Vec<Record>, batch_size: usize) -> Self {
        MemorySource {
            records,
            batch_size,
            filename: "(memory)".to_string(),
        }
    }

    /// A source that produces only the end-of-stream envelope.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl Source for MemorySource {
    fn read(
        &mut self,
        _names: &[String],
        context: Context,
        out: &Sender<Batch>,
        _errors: &Sender<PipelineError>,
        cancel: &Receiver<()>,
    ) {
        let mut batcher = Batcher::new(out, cancel, context, self.batch_size);
        if !self.records.is_empty() {
            batcher.start_file(&self.filename);
        }
        for record in std::mem::take(&mut self.records) {
            if !batcher.push(record) {
                break;
            }
        }
        batcher.finish();
    }
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn chomp(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// Read one line into `buf`, mapping I/O failures to a read error.
/// Returns `false` at end of input.
pub(crate) fn next_line(
    input: &mut dyn BufRead,
    filename: &str,
    buf: &mut String,
) -> Result<bool> {
    buf.clear();
    let n = input
        .read_line(buf)
        .map_err(|source| PipelineError::Read {
            filename: filename.to_string(),
            source,
        })?;
    chomp(buf);
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crossbeam_channel::bounded;
    use std::io::Write;

    fn records(n: i64) -> Vec<Record> {
        (0..n)
            .map(|i| [("i", Value::from_int(i))].into_iter().collect())
            .collect()
    }

    #[test]
    fn test_memory_source_batches_and_ends_with_eos() {
        let (tx, rx) = bounded(100);
        let (etx, _erx) = bounded(1);
        let (_ctx_tx, crx) = bounded(1);
        MemorySource::new(records(5), 2).read(&[], Context::new(), &tx, &etx, &crx);
        drop(tx);
        let batches: Vec<Batch> = rx.iter().collect();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 2]);
        let last = batches.last().and_then(|b| b.last()).unwrap();
        assert!(last.is_end_of_stream());
        assert_eq!(last.context().nr, 5);
    }

    #[test]
    fn test_source_stops_when_cancelled() {
        let (tx, rx) = bounded(100);
        let (etx, _erx) = bounded(1);
        let (ctx_tx, crx) = bounded(1);
        ctx_tx.send(()).unwrap();
        MemorySource::new(records(1000), 10).read(&[], Context::new(), &tx, &etx, &crx);
        drop(tx);
        let envelopes: Vec<Envelope> = rx.iter().flatten().collect();
        assert_eq!(envelopes.len(), 11);
        assert!(envelopes[10].is_end_of_stream());
    }

    #[test]
    fn test_reader_source_reads_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut names = Vec::new();
        for (n, body) in ["a=1\na=2\n", "a=3\n"].iter().enumerate() {
            let path = dir.path().join(format!("in{n}.dkvp"));
            let mut f = File::create(&path).unwrap();
            f.write_all(body.as_bytes()).unwrap();
            names.push(path.to_string_lossy().into_owned());
        }
        let (tx, rx) = bounded(100);
        let (etx, erx) = bounded(1);
        let (_ctx_tx, crx) = bounded(1);
        let mut source = ReaderSource::new(InputFormat::Dkvp.reader(None, None), 500);
        source.read(&names, Context::new(), &tx, &etx, &crx);
        drop(tx);
        assert!(erx.try_recv().is_err());
        let envelopes: Vec<Envelope> = rx.iter().flatten().collect();
        let seen: Vec<(u64, u64, u64)> = envelopes
            .iter()
            .map(|e| {
                let c = e.context();
                (c.nr, c.fnr, c.filenum)
            })
            .collect();
        assert_eq!(seen, vec![(1, 1, 1), (2, 2, 1), (3, 1, 2), (3, 1, 2)]);
        assert!(envelopes[3].is_end_of_stream());
    }

    #[test]
    fn test_reader_source_reports_open_error_without_eos() {
        let (tx, rx) = bounded(100);
        let (etx, erx) = bounded(1);
        let (_ctx_tx, crx) = bounded(1);
        let mut source = ReaderSource::new(InputFormat::Dkvp.reader(None, None), 500);
        source.read(
            &["/nonexistent/recflow-input".to_string()],
            Context::new(),
            &tx,
            &etx,
            &crx,
        );
        drop(tx);
        assert!(matches!(erx.try_recv(), Ok(PipelineError::Open { .. })));
        assert_eq!(rx.iter().flatten().count(), 0);
    }

    #[test]
    fn test_reader_source_delivers_records_read_before_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good.dkvp");
        std::fs::write(&path, "a=1\na=2\na=3\n").unwrap();
        let names = vec![
            path.to_string_lossy().into_owned(),
            dir.path().join("missing.dkvp").to_string_lossy().into_owned(),
        ];
        let (tx, rx) = bounded(100);
        let (etx, erx) = bounded(1);
        let (_ctx_tx, crx) = bounded(1);
        let mut source = ReaderSource::new(InputFormat::Dkvp.reader(None, None), 500);
        source.read(&names, Context::new(), &tx, &etx, &crx);
        drop(tx);
        assert!(matches!(erx.try_recv(), Ok(PipelineError::Open { .. })));
        let envelopes: Vec<Envelope> = rx.iter().flatten().collect();
        assert_eq!(envelopes.len(), 3);
        assert!(envelopes.iter().all(|e| !e.is_end_of_stream()));
    }

    #[test]
    fn test_unknown_format() {
        assert!(InputFormat::parse("xml").is_err());
        assert_eq!(InputFormat::parse("csvlite").unwrap(), InputFormat::Csv);
        assert_eq!(InputFormat::parse("tsv").unwrap(), InputFormat::Tsv);
        assert_eq!(InputFormat::parse("xtab").unwrap(), InputFormat::Xtab);
    }
}

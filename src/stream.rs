//! Stream orchestration: source, verb chain and sink on their own threads,
//! and the wait for whichever of the three outcome signals arrives first.

use std::io::Write;
use std::thread;

use crossbeam_channel::{bounded, select};
use tracing::{debug, info};

use crate::chain::{CHANNEL_CAPACITY, Chain, DEFAULT_BATCH_SIZE, cancel_links};
use crate::context::Context;
use crate::error::{PipelineError, Result};
use crate::input::Source;
use crate::output::{RecordWriter, SinkOptions, SinkSignals, run_sink};
use crate::verb::Verb;

/// Settings for one run.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Envelopes per batch on every channel.
    pub batch_size: usize,
    pub sink: SinkOptions,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            sink: SinkOptions::default(),
        }
    }
}

/// Run `source` through `verbs` into `writer`, writing to `out`.
///
/// Blocks until the first of: a fatal error (input or output), a data error
/// (under `fail_on_data_error`), or the sink finishing. Returns the output
/// stream on success. After a failure the remaining threads wind down on
/// their own as their channels disconnect.
pub fn run_stream<W>(
    mut source: Box<dyn Source>,
    names: Vec<String>,
    verbs: Vec<Box<dyn Verb>>,
    writer: Box<dyn RecordWriter>,
    out: W,
    options: StreamOptions,
) -> Result<W>
where
    W: Write + Send + 'static,
{
    let (fatal_tx, fatal_rx) = bounded::<PipelineError>(1);
    let (data_tx, data_rx) = bounded::<PipelineError>(1);
    let (done_tx, done_rx) = bounded::<()>(1);

    let verb_names: Vec<String> = verbs.iter().map(|v| v.name().to_string()).collect();
    info!(verbs = ?verb_names, files = names.len(), "starting stream");

    let (source_stop, links, _sink_stop) = cancel_links(verbs.len());
    let (source_tx, source_rx) = bounded(CHANNEL_CAPACITY);
    let source_errors = fatal_tx.clone();
    let source_handle = thread::Builder::new()
        .name("source".to_string())
        .spawn(move || {
            source.read(&names, Context::new(), &source_tx, &source_errors, &source_stop);
            debug!("source finished");
        })
        .map_err(|source| PipelineError::Thread {
            name: "source".to_string(),
            source,
        })?;

    let (chain, sink_input) = Chain::spawn(verbs, source_rx, links, options.batch_size)?;

    let signals = SinkSignals {
        fatal: fatal_tx.clone(),
        data: data_tx.clone(),
        done: done_tx,
    };
    let sink_handle = thread::Builder::new()
        .name("sink".to_string())
        .spawn(move || run_sink(sink_input, writer, out, options.sink, signals))
        .map_err(|source| PipelineError::Thread {
            name: "sink".to_string(),
            source,
        })?;

    // Held so the error channels never disconnect while we wait.
    let _held = (fatal_tx, data_tx);

    let outcome = select! {
        recv(fatal_rx) -> e => Err(e.unwrap_or(PipelineError::Incomplete)),
        recv(data_rx) -> e => Err(e.unwrap_or(PipelineError::Incomplete)),
        recv(done_rx) -> done => match done {
            Ok(()) => Ok(()),
            // The sink exited without finishing; find out why.
            Err(_) => Err(fatal_rx
                .try_recv()
                .or_else(|_| data_rx.try_recv())
                .unwrap_or(PipelineError::Incomplete)),
        },
    };
    if let Err(e) = outcome {
        // The sink drains what is already in flight and flushes before it
        // exits. The source may still be blocked on input, so it is not
        // joined.
        if sink_handle.join().is_err() {
            debug!("sink thread panicked");
        }
        return Err(e);
    }

    if source_handle.join().is_err() {
        debug!("source thread panicked");
    }
    chain.join();
    let out = sink_handle.join().map_err(|_| PipelineError::Incomplete)?;
    info!("stream complete");
    Ok(out)
}

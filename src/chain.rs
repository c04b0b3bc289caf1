//! Concurrent verb chain.
//!
//! Each verb runs on its own thread between two bounded channels of
//! batches. A stage exits after forwarding end of stream, or as soon as its
//! upstream disconnects without one; if its downstream disconnects it stops
//! producing and drops its input, which tears down the stages above it in
//! turn.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::debug;

use crate::context::{Batch, Envelope};
use crate::error::{PipelineError, Result};
use crate::verb::{CancelLink, Emitter, Verb};

/// Capacity, in batches, of every channel between stages.
pub const CHANNEL_CAPACITY: usize = 2;

/// Default number of envelopes per batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Build the reverse-direction cancellation links for `stages` verbs.
///
/// Returns the receiver the source polls, one link per verb in chain order,
/// and the sender the sink would use to stop the last verb.
pub fn cancel_links(stages: usize) -> (Receiver<()>, Vec<CancelLink>, Sender<()>) {
    let (first_tx, source_rx) = bounded(1);
    let mut to_upstream = first_tx;
    let mut links = Vec::with_capacity(stages);
    for _ in 0..stages {
        let (tx, rx) = bounded(1);
        links.push(CancelLink::new(rx, to_upstream));
        to_upstream = tx;
    }
    (source_rx, links, to_upstream)
}

/// Running verb threads.
pub struct Chain {
    handles: Vec<JoinHandle<()>>,
}

impl Chain {
    /// Start one thread per verb, reading from `input`. Returns the chain and
    /// the receiving end of its last stage; with no verbs that is `input`.
    pub fn spawn(
        verbs: Vec<Box<dyn Verb>>,
        input: Receiver<Batch>,
        links: Vec<CancelLink>,
        batch_size: usize,
    ) -> Result<(Self, Receiver<Batch>)> {
        let mut upstream = input;
        let mut handles = Vec::with_capacity(verbs.len());
        for (i, (verb, link)) in verbs.into_iter().zip(links).enumerate() {
            let (tx, rx) = bounded(CHANNEL_CAPACITY);
            let name = format!("verb-{i}-{}", verb.name());
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_stage(verb, upstream, tx, link, batch_size))
                .map_err(|source| PipelineError::Thread { name, source })?;
            handles.push(handle);
            upstream = rx;
        }
        Ok((Chain { handles }, upstream))
    }

    /// Wait for every stage thread to exit.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                debug!("verb thread panicked");
            }
        }
    }
}

fn run_stage(
    mut verb: Box<dyn Verb>,
    input: Receiver<Batch>,
    output: Sender<Batch>,
    mut cancel: CancelLink,
    batch_size: usize,
) {
    debug!(verb = verb.name(), "stage started");
    let mut out = Emitter::streaming(&output, batch_size);
    for batch in input.iter() {
        for envelope in batch {
            let end = envelope.is_end_of_stream();
            match envelope {
                Envelope::Text(..) => out.emit(envelope),
                envelope => verb.transform(envelope, &mut out, &mut cancel),
            }
            if end {
                out.flush();
                debug!(verb = verb.name(), "stage finished");
                return;
            }
        }
        out.flush();
        if out.is_disconnected() {
            debug!(verb = verb.name(), "downstream gone; stopping");
            return;
        }
    }
    debug!(verb = verb.name(), "upstream disconnected before end of stream");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::record::Record;
    use crate::value::Value;
    use crate::verbs::build_chain;

    fn record(i: i64) -> Envelope {
        let r: Record = [("i", Value::from_int(i))].into_iter().collect();
        let mut ctx = Context::new();
        ctx.nr = i as u64;
        Envelope::Record(r, ctx)
    }

    fn collect(rx: Receiver<Batch>) -> Vec<Envelope> {
        rx.iter().flatten().collect()
    }

    #[test]
    fn test_empty_chain_passes_input_through() {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let (chain, out) = Chain::spawn(Vec::new(), rx, Vec::new(), 10).unwrap();
        tx.send(vec![record(1), Envelope::EndOfStream(Context::new())])
            .unwrap();
        drop(tx);
        chain.join();
        assert_eq!(collect(out).len(), 2);
    }

    #[test]
    fn test_stage_forwards_text_in_arrival_order() {
        let verbs = build_chain(&[vec!["cat".to_string()]]).unwrap();
        let (_, links, _) = cancel_links(verbs.len());
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let (chain, out) = Chain::spawn(verbs, rx, links, 1).unwrap();
        let ctx = Context::new();
        tx.send(vec![
            record(1),
            Envelope::Text("hello".to_string(), ctx.clone()),
            record(2),
            Envelope::EndOfStream(ctx),
        ])
        .unwrap();
        let received = collect(out);
        chain.join();
        let kinds: Vec<&str> = received
            .iter()
            .map(|e| match e {
                Envelope::Record(..) => "record",
                Envelope::Text(..) => "text",
                Envelope::EndOfStream(_) => "eos",
            })
            .collect();
        assert_eq!(kinds, vec!["record", "text", "record", "eos"]);
    }

    #[test]
    fn test_stage_exits_when_upstream_disconnects() {
        let verbs = build_chain(&[vec!["tac".to_string()]]).unwrap();
        let (_, links, _) = cancel_links(verbs.len());
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let (chain, out) = Chain::spawn(verbs, rx, links, 10).unwrap();
        tx.send(vec![record(1)]).unwrap();
        drop(tx);
        chain.join();
        // No end of stream arrived, so nothing deferred was emitted.
        assert!(collect(out).is_empty());
    }

    #[test]
    fn test_cancel_links_chain_upstream() {
        let (source_rx, mut links, sink_tx) = cancel_links(2);
        sink_tx.send(()).unwrap();
        assert!(links[1].relay());
        assert!(links[0].relay());
        assert!(source_rx.try_recv().is_ok());
    }
}

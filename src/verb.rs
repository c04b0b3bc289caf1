//! The verb contract: the trait every transformation stage implements, the
//! output emitter it writes to, and the cancellation link it relays.
//!
//! A verb sees every envelope of the stream once. Records go to
//! [`Verb::process`]; the single end-of-stream envelope goes to
//! [`Verb::finish`], after which the envelope itself is forwarded. Text
//! envelopes never reach a verb.

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::context::{Batch, Context, Envelope};
use crate::error::{PipelineError, Result};
use crate::record::Record;

/// A stream transformation stage.
///
/// Verbs run on their own thread inside a chain, so they must be `Send`.
/// A verb that keeps records across calls owns them outright; emitting a
/// record moves it downstream.
pub trait Verb: Send {
    /// Verb name, for diagnostics.
    fn name(&self) -> &str;

    /// Handle one record, emitting zero or more envelopes.
    fn process(
        &mut self,
        record: Record,
        ctx: &Context,
        output: &mut Emitter<'_>,
        cancel: &mut CancelLink,
    );

    /// Emit whatever was deferred. Called once, at end of stream, before the
    /// end-of-stream envelope is forwarded.
    fn finish(&mut self, _ctx: &Context, _output: &mut Emitter<'_>, _cancel: &mut CancelLink) {}

    /// Handle one envelope. Relays downstream cancellation upstream on every
    /// call, then dispatches to [`process`](Verb::process) or
    /// [`finish`](Verb::finish).
    fn transform(&mut self, envelope: Envelope, output: &mut Emitter<'_>, cancel: &mut CancelLink) {
        cancel.relay();
        match envelope {
            Envelope::Record(record, ctx) => self.process(record, &ctx, output, cancel),
            Envelope::Text(..) => output.emit(envelope),
            Envelope::EndOfStream(ctx) => {
                self.finish(&ctx, output, cancel);
                output.emit(Envelope::EndOfStream(ctx));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Output accumulator handed to a verb.
///
/// Inside a concurrent chain the emitter sends a batch downstream as soon as
/// it fills, so verbs that expand their input keep bounded memory. When the
/// downstream receiver is gone the emitter drops everything it is given and
/// reports itself disconnected.
pub struct Emitter<'a> {
    buffer: Batch,
    batch_size: usize,
    downstream: Option<&'a Sender<Batch>>,
    disconnected: bool,
}

impl Emitter<'static> {
    /// An emitter that only accumulates; the caller drains it.
    pub fn collecting() -> Self {
        Emitter {
            buffer: Vec::new(),
            batch_size: usize::MAX,
            downstream: None,
            disconnected: false,
        }
    }
}

impl<'a> Emitter<'a> {
    /// An emitter that sends full batches to `downstream`.
    pub fn streaming(downstream: &'a Sender<Batch>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Emitter {
            buffer: Vec::with_capacity(batch_size.min(4096)),
            batch_size,
            downstream: Some(downstream),
            disconnected: false,
        }
    }

    pub fn emit(&mut self, envelope: Envelope) {
        if self.disconnected {
            return;
        }
        self.buffer.push(envelope);
        if self.buffer.len() >= self.batch_size {
            self.flush();
        }
    }

    /// Emit a record carrying a copy of `ctx`.
    pub fn record(&mut self, record: Record, ctx: &Context) {
        self.emit(Envelope::Record(record, ctx.clone()));
    }

    /// Emit a text line carrying a copy of `ctx`.
    pub fn text(&mut self, text: String, ctx: &Context) {
        self.emit(Envelope::Text(text, ctx.clone()));
    }

    /// Send whatever is buffered downstream. No-op for a collecting emitter.
    pub fn flush(&mut self) {
        let Some(downstream) = self.downstream else {
            return;
        };
        if self.buffer.is_empty() || self.disconnected {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        if downstream.send(batch).is_err() {
            debug!("downstream disconnected; dropping further output");
            self.disconnected = true;
        }
    }

    /// Whether the downstream receiver has gone away.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Remove and return everything buffered so far.
    pub fn take(&mut self) -> Batch {
        std::mem::take(&mut self.buffer)
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// One verb's view of the reverse-direction "stop sending" signal.
///
/// Each link in the chain has a capacity-one channel. A verb learns that
/// its downstream wants no more input from `from_downstream`, and tells its
/// upstream the same through `to_upstream`. Signals are best effort.
pub struct CancelLink {
    from_downstream: Option<Receiver<()>>,
    to_upstream: Option<Sender<()>>,
    downstream_done: bool,
    upstream_notified: bool,
}

impl CancelLink {
    pub fn new(from_downstream: Receiver<()>, to_upstream: Sender<()>) -> Self {
        CancelLink {
            from_downstream: Some(from_downstream),
            to_upstream: Some(to_upstream),
            downstream_done: false,
            upstream_notified: false,
        }
    }

    /// A link connected to nothing. Requests are remembered but go nowhere.
    pub fn detached() -> Self {
        CancelLink {
            from_downstream: None,
            to_upstream: None,
            downstream_done: false,
            upstream_notified: false,
        }
    }

    /// Poll the downstream signal and, if it has fired, pass it upstream.
    /// Returns whether downstream is done.
    pub fn relay(&mut self) -> bool {
        if self.poll_downstream() {
            self.request_upstream_stop();
        }
        self.downstream_done
    }

    /// Poll the downstream signal without relaying it.
    pub fn poll_downstream(&mut self) -> bool {
        if !self.downstream_done {
            if let Some(rx) = &self.from_downstream {
                if rx.try_recv().is_ok() {
                    self.downstream_done = true;
                }
            }
        }
        self.downstream_done
    }

    /// Ask upstream to stop producing. Sent at most once.
    pub fn request_upstream_stop(&mut self) {
        if self.upstream_notified {
            return;
        }
        self.upstream_notified = true;
        if let Some(tx) = &self.to_upstream {
            // A full channel already carries the same message.
            let _ = tx.try_send(());
        }
        debug!("requested upstream stop");
    }

    /// Whether this link has asked upstream to stop.
    pub fn upstream_stop_requested(&self) -> bool {
        self.upstream_notified
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Settings every verb constructor may consult.
#[derive(Debug, Clone, Default)]
pub struct VerbConfig {
    /// Seed for verbs that use randomness.
    pub seed: Option<u64>,
}

/// Constructor signature shared by all verbs.
pub type ParseFn = fn(&mut VerbArgs<'_>, &VerbConfig) -> Result<Box<dyn Verb>>;

/// Registry entry for one verb.
pub struct VerbSetup {
    pub name: &'static str,
    pub usage: &'static str,
    pub parse: ParseFn,
    /// Source-like verbs generate their own records; when such a verb leads
    /// the chain no input is read.
    pub ignores_input: bool,
}

/// Argument cursor for one verb's slice of the command line.
///
/// Flags are consumed from the front. Whatever is left after the verb's
/// parser returns is handed back to the caller: for the last verb in a
/// chain those are input file names.
pub struct VerbArgs<'a> {
    verb: &'static str,
    usage: &'static str,
    args: &'a [String],
    pos: usize,
}

impl<'a> VerbArgs<'a> {
    pub fn new(setup: &VerbSetup, args: &'a [String]) -> Self {
        VerbArgs {
            verb: setup.name,
            usage: setup.usage,
            args,
            pos: 0,
        }
    }

    pub fn verb(&self) -> &'static str {
        self.verb
    }

    /// The next flag, if the next argument looks like one. `-h`/`--help`
    /// prints usage and stops parsing.
    pub fn next_flag(&mut self) -> Result<Option<&'a str>> {
        let Some(arg) = self.args.get(self.pos) else {
            return Ok(None);
        };
        if !arg.starts_with('-') || arg.len() < 2 {
            return Ok(None);
        }
        self.pos += 1;
        if arg == "-h" || arg == "--help" {
            println!("{}", self.usage);
            return Err(PipelineError::HelpRequested);
        }
        Ok(Some(arg.as_str()))
    }

    /// The argument following `flag`.
    pub fn value(&mut self, flag: &str) -> Result<&'a str> {
        match self.args.get(self.pos) {
            Some(arg) => {
                self.pos += 1;
                Ok(arg.as_str())
            }
            None => Err(self.error(format!("option {flag} requires an argument"))),
        }
    }

    pub fn string(&mut self, flag: &str) -> Result<String> {
        self.value(flag).map(str::to_string)
    }

    /// A comma-separated list following `flag`.
    pub fn fields(&mut self, flag: &str) -> Result<Vec<String>> {
        Ok(split_fields(self.value(flag)?))
    }

    pub fn int(&mut self, flag: &str) -> Result<i64> {
        let text = self.value(flag)?;
        text.parse()
            .map_err(|_| self.error(format!("option {flag}: \"{text}\" is not an integer")))
    }

    pub fn count(&mut self, flag: &str) -> Result<u64> {
        let text = self.value(flag)?;
        text.parse().map_err(|_| {
            self.error(format!("option {flag}: \"{text}\" is not a non-negative integer"))
        })
    }

    /// A required positional argument.
    pub fn positional(&mut self, what: &str) -> Result<&'a str> {
        match self.args.get(self.pos) {
            Some(arg) => {
                self.pos += 1;
                Ok(arg.as_str())
            }
            None => Err(self.error(format!("missing {what}"))),
        }
    }

    /// Arguments not consumed by the parser.
    pub fn rest(&self) -> &'a [String] {
        &self.args[self.pos.min(self.args.len())..]
    }

    pub fn unknown(&self, flag: &str) -> PipelineError {
        self.error(format!("option \"{flag}\" not recognized\n{}", self.usage))
    }

    pub fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::verb(self.verb, message)
    }
}

/// Split a comma-separated field list, dropping empty names.
pub fn split_fields(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crossbeam_channel::bounded;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const SETUP: VerbSetup = VerbSetup {
        name: "demo",
        usage: "Usage: demo [-n count] [-f a,b,c] name",
        parse: |_, _| Err(PipelineError::Incomplete),
        ignores_input: false,
    };

    #[test]
    fn test_verb_args_cursor() {
        let list = args(&["-n", "4", "-f", "a,,b", "name", "file1"]);
        let mut cursor = VerbArgs::new(&SETUP, &list);
        assert_eq!(cursor.next_flag().unwrap(), Some("-n"));
        assert_eq!(cursor.count("-n").unwrap(), 4);
        assert_eq!(cursor.next_flag().unwrap(), Some("-f"));
        assert_eq!(cursor.fields("-f").unwrap(), vec!["a", "b"]);
        assert_eq!(cursor.next_flag().unwrap(), None);
        assert_eq!(cursor.positional("name").unwrap(), "name");
        assert_eq!(cursor.rest(), &args(&["file1"])[..]);
    }

    #[test]
    fn test_verb_args_errors() {
        let list = args(&["-n"]);
        let mut cursor = VerbArgs::new(&SETUP, &list);
        cursor.next_flag().unwrap();
        let err = cursor.count("-n").unwrap_err();
        assert_eq!(err.to_string(), "demo: option -n requires an argument");

        let list = args(&["-n", "x"]);
        let mut cursor = VerbArgs::new(&SETUP, &list);
        cursor.next_flag().unwrap();
        assert!(cursor.count("-n").is_err());

        let list = args(&["--help"]);
        let mut cursor = VerbArgs::new(&SETUP, &list);
        assert!(matches!(cursor.next_flag(), Err(PipelineError::HelpRequested)));
    }

    #[test]
    fn test_lone_dash_is_not_a_flag() {
        let list = args(&["-"]);
        let mut cursor = VerbArgs::new(&SETUP, &list);
        assert_eq!(cursor.next_flag().unwrap(), None);
    }

    #[test]
    fn test_streaming_emitter_sends_full_batches() {
        let (tx, rx) = bounded(8);
        let ctx = Context::new();
        let mut out = Emitter::streaming(&tx, 2);
        for i in 0..5 {
            let record: Record = [("i", Value::from_int(i))].into_iter().collect();
            out.record(record, &ctx);
        }
        assert_eq!(rx.try_recv().unwrap().len(), 2);
        assert_eq!(rx.try_recv().unwrap().len(), 2);
        assert!(rx.try_recv().is_err());
        out.flush();
        assert_eq!(rx.try_recv().unwrap().len(), 1);
    }

    #[test]
    fn test_emitter_detects_disconnect() {
        let (tx, rx) = bounded(8);
        drop(rx);
        let mut out = Emitter::streaming(&tx, 1);
        out.text("x".to_string(), &Context::new());
        assert!(out.is_disconnected());
        out.text("y".to_string(), &Context::new());
        assert!(out.take().is_empty());
    }

    #[test]
    fn test_collecting_emitter_never_sends() {
        let mut out = Emitter::collecting();
        for _ in 0..3 {
            out.text("t".to_string(), &Context::new());
        }
        out.flush();
        assert_eq!(out.take().len(), 3);
    }

    #[test]
    fn test_cancel_link_relays_once() {
        let (down_tx, down_rx) = bounded(1);
        let (up_tx, up_rx) = bounded(1);
        let mut link = CancelLink::new(down_rx, up_tx);
        assert!(!link.relay());
        assert!(up_rx.try_recv().is_err());

        down_tx.send(()).unwrap();
        assert!(link.relay());
        assert!(link.relay());
        assert!(up_rx.try_recv().is_ok());
        assert!(up_rx.try_recv().is_err());
        assert!(link.upstream_stop_requested());
    }

    #[test]
    fn test_detached_link_remembers_requests() {
        let mut link = CancelLink::detached();
        assert!(!link.relay());
        link.request_upstream_stop();
        assert!(link.upstream_stop_requested());
    }
}

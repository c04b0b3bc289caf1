//! Stream position metadata and the envelopes that carry records between
//! stages.

use std::sync::Arc;

use crate::record::Record;

/// Where a record sits in the input stream. Copied, never shared mutably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Global 1-up record number across all inputs.
    pub nr: u64,
    /// 1-up record number within the current file.
    pub fnr: u64,
    pub filename: Arc<str>,
    /// 1-up index of the current file.
    pub filenum: u64,
}

impl Context {
    pub fn new() -> Self {
        Context {
            nr: 0,
            fnr: 0,
            filename: Arc::from("(stdin)"),
            filenum: 0,
        }
    }

    /// Advance to the start of the next file.
    pub fn start_file(&mut self, filename: &str) {
        self.filename = Arc::from(filename);
        self.filenum += 1;
        self.fnr = 0;
    }

    /// Advance past one record and return the context that record carries.
    pub fn advance(&mut self) -> Context {
        self.nr += 1;
        self.fnr += 1;
        self.clone()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// The unit passed between stages.
#[derive(Debug, Clone)]
pub enum Envelope {
    Record(Record, Context),
    /// Side-channel text such as `print` output. Bypasses verbs.
    Text(String, Context),
    /// Exactly one per run, after every other envelope.
    EndOfStream(Context),
}

impl Envelope {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Envelope::EndOfStream(_))
    }

    pub fn context(&self) -> &Context {
        match self {
            Envelope::Record(_, ctx) | Envelope::Text(_, ctx) | Envelope::EndOfStream(ctx) => ctx,
        }
    }
}

/// Envelopes travel between threads in batches.
pub type Batch = Vec<Envelope>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_advance_across_files() {
        let mut ctx = Context::new();
        ctx.start_file("a.dkvp");
        let first = ctx.advance();
        let second = ctx.advance();
        ctx.start_file("b.dkvp");
        let third = ctx.advance();

        assert_eq!((first.nr, first.fnr, first.filenum), (1, 1, 1));
        assert_eq!((second.nr, second.fnr), (2, 2));
        assert_eq!((third.nr, third.fnr, third.filenum), (3, 1, 2));
        assert_eq!(&*third.filename, "b.dkvp");
        assert_eq!(&*first.filename, "a.dkvp");
    }

    #[test]
    fn test_envelope_context() {
        let ctx = Context::new();
        let eos = Envelope::EndOfStream(ctx.clone());
        assert!(eos.is_end_of_stream());
        assert_eq!(eos.context(), &ctx);
        assert!(!Envelope::Text("x".into(), ctx).is_end_of_stream());
    }
}

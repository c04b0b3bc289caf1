//! Bounded-prefix and bounded-suffix verbs.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// head
// ---------------------------------------------------------------------------

pub const HEAD: VerbSetup = VerbSetup {
    name: "head",
    usage: "\
Usage: recflow head [options]
Passes through the first n records, optionally by category.
Without -g, ceases consuming more input (i.e. is fast) when n records have
been read.
Options:
 -g {a,b,c} Optional group-by-field names for head counts, e.g. a,b,c.
 -n {n}     Head-count to print. Default 10.",
    parse: parse_head,
    ignores_input: false,
};

/// head - passes the first n records, overall or per group.
struct Head {
    limit: u64,
    group_by: Option<Vec<String>>,
    seen: u64,
    group_seen: IndexMap<String, u64>,
}

fn parse_head(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut limit = 10;
    let mut group_by = None;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-n" => limit = args.count(flag)?,
            "-g" => group_by = Some(args.fields(flag)?),
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(Head {
        limit,
        group_by,
        seen: 0,
        group_seen: IndexMap::new(),
    }))
}

impl Verb for Head {
    fn name(&self) -> &str {
        "head"
    }

    fn process(
        &mut self,
        record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        cancel: &mut CancelLink,
    ) {
        let Some(fields) = &self.group_by else {
            if self.seen < self.limit {
                self.seen += 1;
                out.record(record, ctx);
            }
            if self.seen >= self.limit && !cancel.upstream_stop_requested() {
                debug!(limit = self.limit, "head satisfied");
                cancel.request_upstream_stop();
            }
            return;
        };
        let Some(key) = record.grouping_key(fields) else {
            return;
        };
        let seen = self.group_seen.entry(key).or_insert(0);
        if *seen < self.limit {
            *seen += 1;
            out.record(record, ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// tail
// ---------------------------------------------------------------------------

pub const TAIL: VerbSetup = VerbSetup {
    name: "tail",
    usage: "\
Usage: recflow tail [options]
Passes through the last n records, optionally by category.
Options:
 -g {a,b,c} Optional group-by-field names for tail counts, e.g. a,b,c.
 -n {n}     Tail-count to print. Default 10.",
    parse: parse_tail,
    ignores_input: false,
};

/// tail - keeps the last n records of each group, emitted at end of stream
/// in first-seen group order.
struct Tail {
    limit: usize,
    group_by: Vec<String>,
    groups: IndexMap<String, VecDeque<(Record, Context)>>,
}

fn parse_tail(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut limit = 10;
    let mut group_by = Vec::new();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-n" => limit = args.count(flag)? as usize,
            "-g" => group_by = args.fields(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(Tail {
        limit,
        group_by,
        groups: IndexMap::new(),
    }))
}

impl Verb for Tail {
    fn name(&self) -> &str {
        "tail"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        if self.limit == 0 {
            return;
        }
        let Some(key) = record.grouping_key(&self.group_by) else {
            return;
        };
        let kept = self.groups.entry(key).or_default();
        if kept.len() == self.limit {
            kept.pop_front();
        }
        kept.push_back((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        for (_, kept) in self.groups.drain(..) {
            for (record, ctx) in kept {
                out.record(record, &ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::verbs::testing::*;

    #[test]
    fn test_head() {
        assert_eq!(run("head -n 2 then cut -f i", ABIXY), "i=1\ni=2");
        assert_eq!(run("head -n 0", ABIXY), "");
        assert_eq!(run("head then cut -f i", ABIXY), "i=1\ni=2\ni=3\ni=4\ni=5");
    }

    #[test]
    fn test_grouped_head() {
        let out = run("head -n 1 -g a then cut -f a,i", ABIXY);
        assert_eq!(out, "a=pan,i=1\na=eks,i=2\na=wye,i=3");
    }

    #[test]
    fn test_head_requests_upstream_stop() {
        use crate::verb::{CancelLink, Emitter};
        let mut verbs = crate::verbs::build_chain(&segments("head -n 1")).unwrap();
        let mut link = CancelLink::detached();
        let mut out = Emitter::collecting();
        let ctx = crate::context::Context::new();
        verbs[0].process(crate::record::Record::new(), &ctx, &mut out, &mut link);
        assert!(link.upstream_stop_requested());
    }

    #[test]
    fn test_tail() {
        assert_eq!(run("tail -n 2 then cut -f i", ABIXY), "i=4\ni=5");
        let out = run("tail -n 1 -g a then cut -f a,i", ABIXY);
        assert_eq!(out, "a=pan,i=1\na=eks,i=4\na=wye,i=5");
    }
}

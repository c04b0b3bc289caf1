//! Whole-stream reordering verbs.

use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// tac
// ---------------------------------------------------------------------------

pub const TAC: VerbSetup = VerbSetup {
    name: "tac",
    usage: "\
Usage: recflow tac
Prints records in reverse order from the order in which they were encountered.",
    parse: parse_tac,
    ignores_input: false,
};

/// tac - reverses the stream.
struct Tac {
    records: Vec<(Record, Context)>,
}

fn parse_tac(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    Ok(Box::new(Tac {
        records: Vec::new(),
    }))
}

impl Verb for Tac {
    fn name(&self) -> &str {
        "tac"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        self.records.push((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        while let Some((record, ctx)) = self.records.pop() {
            out.record(record, &ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// shuffle
// ---------------------------------------------------------------------------

pub const SHUFFLE: VerbSetup = VerbSetup {
    name: "shuffle",
    usage: "\
Usage: recflow shuffle
Outputs records randomly permuted. No output records are produced until
all input records are read. Use the main --seed option for repeatable output.",
    parse: parse_shuffle,
    ignores_input: false,
};

/// shuffle - emits the stream in random order.
struct Shuffle {
    rng: StdRng,
    records: Vec<(Record, Context)>,
}

fn parse_shuffle(args: &mut VerbArgs<'_>, config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    Ok(Box::new(Shuffle {
        rng,
        records: Vec::new(),
    }))
}

impl Verb for Shuffle {
    fn name(&self) -> &str {
        "shuffle"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        self.records.push((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        self.records.shuffle(&mut self.rng);
        for (record, ctx) in self.records.drain(..) {
            out.record(record, &ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// sort
// ---------------------------------------------------------------------------

pub const SORT: VerbSetup = VerbSetup {
    name: "sort",
    usage: "\
Usage: recflow sort {flags}
Sorts records primarily by the first specified field, secondarily by the second
field, and so on. (Any records not having all specified sort keys will appear
at end of output, in the order they were encountered, regardless of the
specified sort order.) The sort is stable: records that compare equal will sort
in the order they were encountered in the input record stream.
Options:
 -f  {comma-separated field names}  Lexical ascending
 -r  {comma-separated field names}  Lexical descending
 -c  {comma-separated field names}  Case-folded lexical ascending
 -cr {comma-separated field names}  Case-folded lexical descending
 -nf {comma-separated field names}  Numerical ascending; nulls sort last
 -nr {comma-separated field names}  Numerical descending; nulls sort first
Example:
 recflow sort -f a,b -nr x,y,z
which is the same as:
 recflow sort -f a -f b -nr x -nr y -nr z",
    parse: parse_sort,
    ignores_input: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Lexical,
    CaseFolded,
    Numeric,
}

struct Criterion {
    field: String,
    order: Order,
    descending: bool,
}

#[derive(Debug, Clone)]
enum SortKey {
    Text(String),
    /// `None` for values that are not numbers, and for NaN.
    Number(Option<f64>),
}

/// sort - stable multi-key sort of the whole stream.
struct Sort {
    criteria: Vec<Criterion>,
    keyed: Vec<(Vec<SortKey>, Record, Context)>,
    unkeyed: Vec<(Record, Context)>,
}

fn parse_sort(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut criteria = Vec::new();
    while let Some(flag) = args.next_flag()? {
        let (order, descending) = match flag {
            "-f" => (Order::Lexical, false),
            "-r" => (Order::Lexical, true),
            "-c" => (Order::CaseFolded, false),
            "-cr" => (Order::CaseFolded, true),
            "-nf" => (Order::Numeric, false),
            "-nr" => (Order::Numeric, true),
            _ => return Err(args.unknown(flag)),
        };
        for field in args.fields(flag)? {
            criteria.push(Criterion {
                field,
                order,
                descending,
            });
        }
    }
    if criteria.is_empty() {
        return Err(args.error("no sort keys given"));
    }
    Ok(Box::new(Sort {
        criteria,
        keyed: Vec::new(),
        unkeyed: Vec::new(),
    }))
}

fn compare_keys(criteria: &[Criterion], a: &[SortKey], b: &[SortKey]) -> Ordering {
    for (criterion, (x, y)) in criteria.iter().zip(a.iter().zip(b)) {
        let ord = match (x, y) {
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            (SortKey::Number(Some(x)), SortKey::Number(Some(y))) => x.total_cmp(y),
            // Non-numeric values sort after numbers when ascending.
            (SortKey::Number(Some(_)), SortKey::Number(None)) => Ordering::Less,
            (SortKey::Number(None), SortKey::Number(Some(_))) => Ordering::Greater,
            _ => Ordering::Equal,
        };
        let ord = if criterion.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Verb for Sort {
    fn name(&self) -> &str {
        "sort"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        let mut keys = Vec::with_capacity(self.criteria.len());
        for criterion in &self.criteria {
            let Some(value) = record.get(&criterion.field) else {
                self.unkeyed.push((record, ctx.clone()));
                return;
            };
            keys.push(match criterion.order {
                Order::Lexical => SortKey::Text(value.to_string()),
                Order::CaseFolded => SortKey::Text(value.to_string().to_lowercase()),
                Order::Numeric => SortKey::Number(value.as_number().filter(|n| !n.is_nan())),
            });
        }
        self.keyed.push((keys, record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        let criteria = &self.criteria;
        self.keyed.sort_by(|a, b| compare_keys(criteria, &a.0, &b.0));
        for (_, record, ctx) in self.keyed.drain(..) {
            out.record(record, &ctx);
        }
        for (record, ctx) in self.unkeyed.drain(..) {
            out.record(record, &ctx);
        }
    }
}

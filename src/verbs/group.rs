//! Verbs that regroup the whole stream.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup, split_fields};

/// Records bucketed by grouping key, in first-seen key order.
type Buckets = IndexMap<String, Vec<(Record, Context)>>;

fn emit_buckets(buckets: &mut Buckets, out: &mut Emitter<'_>) {
    for (_, records) in buckets.drain(..) {
        for (record, ctx) in records {
            out.record(record, &ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// group-by
// ---------------------------------------------------------------------------

pub const GROUP_BY: VerbSetup = VerbSetup {
    name: "group-by",
    usage: "\
Usage: recflow group-by {comma-separated field names}
Outputs records in batches having identical values at specified field names.
Records lacking any of the fields are dropped.",
    parse: parse_group_by,
    ignores_input: false,
};

/// group-by - outputs records grouped by the values of the named fields.
struct GroupBy {
    fields: Vec<String>,
    buckets: Buckets,
}

fn parse_group_by(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    let fields = split_fields(args.positional("group-by field names")?);
    Ok(Box::new(GroupBy {
        fields,
        buckets: IndexMap::new(),
    }))
}

impl Verb for GroupBy {
    fn name(&self) -> &str {
        "group-by"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        if let Some(key) = record.grouping_key(&self.fields) {
            self.buckets.entry(key).or_default().push((record, ctx.clone()));
        }
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        emit_buckets(&mut self.buckets, out);
    }
}

// ---------------------------------------------------------------------------
// group-like
// ---------------------------------------------------------------------------

pub const GROUP_LIKE: VerbSetup = VerbSetup {
    name: "group-like",
    usage: "\
Usage: recflow group-like
Outputs records in batches having identical field names.",
    parse: parse_group_like,
    ignores_input: false,
};

/// group-like - outputs records grouped by schema.
struct GroupLike {
    buckets: Buckets,
}

fn parse_group_like(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    Ok(Box::new(GroupLike {
        buckets: IndexMap::new(),
    }))
}

impl Verb for GroupLike {
    fn name(&self) -> &str {
        "group-like"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        let schema = record.joined_keys();
        self.buckets.entry(schema).or_default().push((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        emit_buckets(&mut self.buckets, out);
    }
}

// ---------------------------------------------------------------------------
// count-similar
// ---------------------------------------------------------------------------

pub const COUNT_SIMILAR: VerbSetup = VerbSetup {
    name: "count-similar",
    usage: "\
Usage: recflow count-similar [options]
Ingests all records, then emits each record augmented by a count of
the number of records having the same group-by field values. Records
are emitted grouped together, in first-seen group order.
Options:
 -g {a,b,c} Group-by-field names for counts, e.g. a,b,c. Required.
 -o {name}  Field name for output-counts. Defaults to \"count\".",
    parse: parse_count_similar,
    ignores_input: false,
};

/// count-similar - appends the size of each record's group.
struct CountSimilar {
    fields: Vec<String>,
    output: String,
    buckets: Buckets,
}

fn parse_count_similar(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut output = "count".to_string();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-g" => fields = Some(args.fields(flag)?),
            "-o" => output = args.string(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -g is required"));
    };
    Ok(Box::new(CountSimilar {
        fields,
        output,
        buckets: IndexMap::new(),
    }))
}

impl Verb for CountSimilar {
    fn name(&self) -> &str {
        "count-similar"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        if let Some(key) = record.grouping_key(&self.fields) {
            self.buckets.entry(key).or_default().push((record, ctx.clone()));
        }
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        for (_, records) in self.buckets.drain(..) {
            let count = records.len() as i64;
            for (mut record, ctx) in records {
                record.put(self.output.as_str(), Value::from_int(count));
                out.record(record, &ctx);
            }
        }
    }
}

//! Pass-through verbs.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

pub const CAT: VerbSetup = VerbSetup {
    name: "cat",
    usage: "\
Usage: recflow cat [options]
Passes input records directly to output. Most useful for format conversion.
Options:
 -n           Prepend field \"n\" to each record with record-counter starting at 1.
 -N {name}    Prepend field {name} to each record with record-counter starting at 1.
 -g {a,b,c}   Optional group-by-field names for -n/-N, e.g. a,b,c.
              Records lacking any of the fields are dropped.
 --filename   Prepend field \"filename\" with the current input file name.
 --filenum    Prepend field \"filenum\" with the current input file number.",
    parse: parse_cat,
    ignores_input: false,
};

/// cat - passes records through, optionally numbering them.
struct Cat {
    counter_field: Option<String>,
    group_by: Option<Vec<String>>,
    filename: bool,
    filenum: bool,
    count: i64,
    group_counts: IndexMap<String, i64>,
}

fn parse_cat(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut counter_field = None;
    let mut group_by = None;
    let mut filename = false;
    let mut filenum = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-n" => counter_field = Some("n".to_string()),
            "-N" => counter_field = Some(args.string(flag)?),
            "-g" => group_by = Some(args.fields(flag)?),
            "--filename" => filename = true,
            "--filenum" => filenum = true,
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(Cat {
        counter_field,
        group_by,
        filename,
        filenum,
        count: 0,
        group_counts: IndexMap::new(),
    }))
}

impl Verb for Cat {
    fn name(&self) -> &str {
        "cat"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let counter = match &self.group_by {
            None => {
                self.count += 1;
                self.count
            }
            Some(fields) => {
                let Some(key) = record.grouping_key(fields) else {
                    return;
                };
                let n = self.group_counts.entry(key).or_insert(0);
                *n += 1;
                *n
            }
        };
        if self.filename {
            record.prepend("filename", Value::from_string(&*ctx.filename));
        }
        if self.filenum {
            record.prepend("filenum", Value::from_int(ctx.filenum as i64));
        }
        if let Some(field) = &self.counter_field {
            record.prepend(field.as_str(), Value::from_int(counter));
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// nothing
// ---------------------------------------------------------------------------

pub const NOTHING: VerbSetup = VerbSetup {
    name: "nothing",
    usage: "\
Usage: recflow nothing
Drops all input records. Useful for testing, or after tee/print/etc. have
produced other output.",
    parse: parse_nothing,
    ignores_input: false,
};

/// nothing - drops every record.
struct Nothing;

fn parse_nothing(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    Ok(Box::new(Nothing))
}

impl Verb for Nothing {
    fn name(&self) -> &str {
        "nothing"
    }

    fn process(&mut self, _: Record, _: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {}
}

//! Verbs that make heterogeneous streams rectangular, or trim them.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// unsparsify
// ---------------------------------------------------------------------------

pub const UNSPARSIFY: VerbSetup = VerbSetup {
    name: "unsparsify",
    usage: "\
Usage: recflow unsparsify [options]
Prints records with the union of field names over all input records.
For field names absent in a given record but present in others, fills in
a value. This verb retains all input before producing any output.
Options:
 --fill-with {filler string}  What to fill absent fields with. Defaults to
                              the empty string.
 -f {a,b,c} Specify field names to be operated on. Any other fields won't be
            modified, and operation will be streaming (no retention of
            all input). May be given more than once.
Example: if the input is two records, one being 'a=1,b=2' and the other
being 'b=3,c=4', then the output is the two records 'a=1,b=2,c=' and
'a=,b=3,c=4'.",
    parse: parse_unsparsify,
    ignores_input: false,
};

/// unsparsify - fills every record out to the union of all field names.
struct Unsparsify {
    fill_with: String,
    /// Set by `-f`: fill only these, as records stream past.
    fields: Option<Vec<String>>,
    union: IndexSet<String>,
    records: Vec<(Record, Context)>,
}

fn parse_unsparsify(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fill_with = String::new();
    let mut fields: Option<Vec<String>> = None;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "--fill-with" => fill_with = args.string(flag)?,
            "-f" => fields.get_or_insert_with(Vec::new).extend(args.fields(flag)?),
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(Unsparsify {
        fill_with,
        fields,
        union: IndexSet::new(),
        records: Vec::new(),
    }))
}

impl Unsparsify {
    fn filler(&self) -> Value {
        Value::from_data(self.fill_with.as_str())
    }
}

impl Verb for Unsparsify {
    fn name(&self) -> &str {
        "unsparsify"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        if let Some(fields) = &self.fields {
            for field in fields {
                if !record.has(field) {
                    record.put(field.as_str(), self.filler());
                }
            }
            out.record(record, ctx);
            return;
        }
        for key in record.keys() {
            if !self.union.contains(key) {
                self.union.insert(key.to_string());
            }
        }
        self.records.push((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        let records = std::mem::take(&mut self.records);
        for (mut record, ctx) in records {
            let mut filled = Record::new();
            for key in &self.union {
                let value = record.remove(key).unwrap_or_else(|| self.filler());
                filled.put(key.as_str(), value);
            }
            out.record(filled, &ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// remove-empty-columns
// ---------------------------------------------------------------------------

pub const REMOVE_EMPTY_COLUMNS: VerbSetup = VerbSetup {
    name: "remove-empty-columns",
    usage: "\
Usage: recflow remove-empty-columns
Omits fields which are empty on every input row. Non-streaming.",
    parse: parse_remove_empty_columns,
    ignores_input: false,
};

/// remove-empty-columns - drops fields that are empty in every record.
struct RemoveEmptyColumns {
    non_empty: HashSet<String>,
    records: Vec<(Record, Context)>,
}

fn parse_remove_empty_columns(
    args: &mut VerbArgs<'_>,
    _config: &VerbConfig,
) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    Ok(Box::new(RemoveEmptyColumns {
        non_empty: HashSet::new(),
        records: Vec::new(),
    }))
}

impl Verb for RemoveEmptyColumns {
    fn name(&self) -> &str {
        "remove-empty-columns"
    }

    fn process(&mut self, record: Record, ctx: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        for (key, value) in &record {
            if !value.is_void() && !self.non_empty.contains(key) {
                self.non_empty.insert(key.to_string());
            }
        }
        self.records.push((record, ctx.clone()));
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        for (mut record, ctx) in self.records.drain(..) {
            record.retain(|key, _| self.non_empty.contains(key));
            out.record(record, &ctx);
        }
    }
}

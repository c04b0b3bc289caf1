//! Verbs that fill in missing or empty values.

use std::collections::HashMap;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// fill-empty
// ---------------------------------------------------------------------------

pub const FILL_EMPTY: VerbSetup = VerbSetup {
    name: "fill-empty",
    usage: "\
Usage: recflow fill-empty [options]
Fills empty-string fields with specified fill-value.
Options:
 -v {string}       Fill-value: defaults to \"N/A\".
 -S                Don't infer type -- so '-v 0' would fill string 0 not int 0.
 --only-if-blank   Also fill values consisting only of whitespace.",
    parse: parse_fill_empty,
    ignores_input: false,
};

/// fill-empty - replaces empty values with a constant.
struct FillEmpty {
    fill: Value,
    blank_counts: bool,
}

fn parse_fill_empty(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fill = "N/A".to_string();
    let mut infer = true;
    let mut blank_counts = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-v" => fill = args.string(flag)?,
            "-S" => infer = false,
            "--only-if-blank" => blank_counts = true,
            _ => return Err(args.unknown(flag)),
        }
    }
    let fill = if infer {
        Value::from_data(fill)
    } else {
        Value::from_string(fill)
    };
    Ok(Box::new(FillEmpty { fill, blank_counts }))
}

impl FillEmpty {
    fn is_empty(&self, value: &Value) -> bool {
        if value.is_void() {
            return true;
        }
        self.blank_counts
            && value
                .original()
                .is_some_and(|text| text.chars().all(char::is_whitespace))
    }
}

impl Verb for FillEmpty {
    fn name(&self) -> &str {
        "fill-empty"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let empty: Vec<String> = record
            .iter()
            .filter(|(_, value)| self.is_empty(value))
            .map(|(key, _)| key.to_string())
            .collect();
        for key in empty {
            record.put(key, self.fill.clone());
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// fill-down
// ---------------------------------------------------------------------------

pub const FILL_DOWN: VerbSetup = VerbSetup {
    name: "fill-down",
    usage: "\
Usage: recflow fill-down [options]
If a given record has a missing value for a given field, fill that from
the corresponding value from a previous record, if any.
By default, a 'missing' field either is absent, or has the empty-string value.
With -a, a field is 'missing' only if it is absent.
Options:
 --all                Operate on all fields in the input. Only empty values
                      are filled, since absent ones cannot be known.
 -a|--only-if-absent  Fill only fields that are absent.
 --only-if-blank      Fill only fields that are present with an empty value.
 -f {a,b,c}           Field names for fill-down.",
    parse: parse_fill_down,
    ignores_input: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    AbsentOrEmpty,
    Absent,
    Empty,
}

/// fill-down - carries the last seen value of a field into later records.
struct FillDown {
    /// `None` means every field.
    fields: Option<Vec<String>>,
    missing: Missing,
    last: HashMap<String, Value>,
}

fn parse_fill_down(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut all = false;
    let mut missing = Missing::AbsentOrEmpty;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "--all" => all = true,
            "-a" | "--only-if-absent" => missing = Missing::Absent,
            "--only-if-blank" => missing = Missing::Empty,
            _ => return Err(args.unknown(flag)),
        }
    }
    let fields = match (fields, all) {
        (Some(_), true) => return Err(args.error("-f and --all are mutually exclusive")),
        (None, false) => return Err(args.error("one of -f or --all is required")),
        (fields, _) => fields,
    };
    if all {
        missing = Missing::Empty;
    }
    Ok(Box::new(FillDown {
        fields,
        missing,
        last: HashMap::new(),
    }))
}

impl FillDown {
    fn fill_field(&mut self, record: &mut Record, field: &str) {
        let present = record.get(field);
        let needs_fill = match (self.missing, present) {
            (Missing::Absent, None) | (Missing::AbsentOrEmpty, None) => true,
            (Missing::Absent, Some(_)) | (Missing::Empty, None) => false,
            (_, Some(value)) => value.is_void(),
        };
        if needs_fill {
            if let Some(previous) = self.last.get(field) {
                record.put(field, previous.clone());
            }
        } else if let Some(value) = present {
            self.last.insert(field.to_string(), value.clone());
        }
    }
}

impl Verb for FillDown {
    fn name(&self) -> &str {
        "fill-down"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let fields = match &self.fields {
            Some(fields) => fields.clone(),
            None => record.keys().map(str::to_string).collect(),
        };
        for field in &fields {
            self.fill_field(&mut record, field);
        }
        out.record(record, ctx);
    }
}

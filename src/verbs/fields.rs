//! Verbs that select, rename or reorder the fields of each record.

use std::collections::HashSet;

use regex::Regex;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::script::functions::capture_references;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup, split_fields};

use super::regex_arg;

// ---------------------------------------------------------------------------
// cut
// ---------------------------------------------------------------------------

pub const CUT: VerbSetup = VerbSetup {
    name: "cut",
    usage: "\
Usage: recflow cut [options]
Passes through input records with specified fields included/excluded.
Options:
 -f {a,b,c} Comma-separated field names for cut, e.g. a,b,c.
 -o         Retain fields in the order specified here in the argument list.
            Default is to retain them in the order found in the input data.
 -x         Exclude, rather than include, field names specified by -f.
 -r         Treat field names as regular expressions. \"ab\", \"a.*b\" will
            match any field name containing the substring \"ab\" or matching
            \"a.*b\" respectively; anchors will be respected. The regex may be
            written \"...\"i for case-insensitive matching.",
    parse: parse_cut,
    ignores_input: false,
};

enum Selector {
    Names(Vec<String>, HashSet<String>),
    Patterns(Vec<Regex>),
}

impl Selector {
    fn matches(&self, key: &str) -> bool {
        match self {
            Selector::Names(_, set) => set.contains(key),
            Selector::Patterns(patterns) => patterns.iter().any(|re| re.is_match(key)),
        }
    }
}

/// cut - keeps or drops the named fields.
struct Cut {
    selector: Selector,
    in_argument_order: bool,
    exclude: bool,
}

fn parse_cut(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut in_argument_order = false;
    let mut exclude = false;
    let mut regexes = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "-o" => in_argument_order = true,
            "-x" => exclude = true,
            "-r" => regexes = true,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -f is required"));
    };
    let selector = if regexes {
        let cursor = &*args;
        let patterns = fields
            .iter()
            .map(|f| regex_arg(cursor, f))
            .collect::<Result<Vec<_>>>()?;
        Selector::Patterns(patterns)
    } else {
        let set = fields.iter().cloned().collect();
        Selector::Names(fields, set)
    };
    Ok(Box::new(Cut {
        selector,
        in_argument_order,
        exclude,
    }))
}

impl Verb for Cut {
    fn name(&self) -> &str {
        "cut"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        if self.exclude {
            record.retain(|key, _| !self.selector.matches(key));
        } else if let (true, Selector::Names(names, _)) = (self.in_argument_order, &self.selector) {
            let mut selected = Record::new();
            for name in names {
                if let Some(value) = record.remove(name) {
                    selected.put(name.as_str(), value);
                }
            }
            record = selected;
        } else {
            record.retain(|key, _| self.selector.matches(key));
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// rename
// ---------------------------------------------------------------------------

pub const RENAME: VerbSetup = VerbSetup {
    name: "rename",
    usage: "\
Usage: recflow rename [options] {old1,new1,old2,new2,...}
Renames specified fields.
Options:
 -r         Treat old field names as regular expressions. \"ab\", \"a.*b\" will
            match any field name containing the substring \"ab\" or matching
            \"a.*b\" respectively; anchors will be respected. New names may
            refer to capture groups as \\1 through \\9.
 -g         Do global replacement within field names, as with gsub.
            Implies -r.
Examples:
 recflow rename old_name,new_name
 recflow rename -r '^(.*)_in$,in_\\1'
 recflow rename -g -r 'e,X'   renames \"xyeez\" to \"xyXXz\"",
    parse: parse_rename,
    ignores_input: false,
};

enum Renaming {
    Names(Vec<(String, String)>),
    Patterns { pairs: Vec<(Regex, String)>, global: bool },
}

/// rename - renames fields in place, by name or by regex.
struct Rename {
    renaming: Renaming,
}

fn parse_rename(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut regexes = false;
    let mut global = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-r" => regexes = true,
            "-g" => {
                regexes = true;
                global = true;
            }
            _ => return Err(args.unknown(flag)),
        }
    }
    let names = split_fields(args.positional("old,new list")?);
    if names.len() % 2 != 0 {
        return Err(args.error("field-name list must have even length"));
    }
    let pairs = names.chunks(2).map(|pair| (pair[0].clone(), pair[1].clone()));
    let renaming = if regexes {
        let cursor = &*args;
        let pairs = pairs
            .map(|(old, new)| Ok((regex_arg(cursor, &old)?, capture_references(&new))))
            .collect::<Result<Vec<_>>>()?;
        Renaming::Patterns { pairs, global }
    } else {
        Renaming::Names(pairs.collect())
    };
    Ok(Box::new(Rename { renaming }))
}

impl Verb for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        match &self.renaming {
            Renaming::Names(pairs) => {
                for (old, new) in pairs {
                    record.rename(old, new);
                }
            }
            Renaming::Patterns { pairs, global } => {
                for (re, replacement) in pairs {
                    let keys: Vec<String> = record.keys().map(str::to_string).collect();
                    for key in keys {
                        if !re.is_match(&key) {
                            continue;
                        }
                        let new = if *global {
                            re.replace_all(&key, replacement.as_str())
                        } else {
                            re.replace(&key, replacement.as_str())
                        };
                        record.rename(&key, &new);
                    }
                }
            }
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// reorder
// ---------------------------------------------------------------------------

pub const REORDER: VerbSetup = VerbSetup {
    name: "reorder",
    usage: "\
Usage: recflow reorder [options]
Moves specified names to start of record, or end with -e.
Options:
 -f {a,b,c} Field names to reorder.
 -e         Put specified field names at record end: default is to put them at
            record start.
Examples:
 recflow reorder    -f a,b sends input record \"d=4,b=2,a=1,c=3\" to \"a=1,b=2,d=4,c=3\".
 recflow reorder -e -f a,b sends input record \"d=4,b=2,a=1,c=3\" to \"d=4,c=3,a=1,b=2\".",
    parse: parse_reorder,
    ignores_input: false,
};

/// reorder - moves the named fields to the front or back.
struct Reorder {
    fields: Vec<String>,
    to_end: bool,
}

fn parse_reorder(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut to_end = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "-e" => to_end = true,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -f is required"));
    };
    Ok(Box::new(Reorder { fields, to_end }))
}

impl Verb for Reorder {
    fn name(&self) -> &str {
        "reorder"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        if self.to_end {
            for field in &self.fields {
                record.move_to_back(field);
            }
        } else {
            for field in self.fields.iter().rev() {
                record.move_to_front(field);
            }
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// template
// ---------------------------------------------------------------------------

pub const TEMPLATE: VerbSetup = VerbSetup {
    name: "template",
    usage: "\
Usage: recflow template [options]
Fills in missing fields with a fill-with value, and puts fields in the given
order. Fields not named in the template are dropped.
Options:
 -f {a,b,c}             Field names for the output template.
 --fill-with {filler}   What to fill absent fields with. Defaults to the empty string.
Example:
 recflow template -f a,b,c sends \"b=2,d=4\" to \"a=,b=2,c=\".",
    parse: parse_template,
    ignores_input: false,
};

/// template - reshapes every record to a fixed field list.
struct Template {
    fields: Vec<String>,
    fill_with: String,
}

fn parse_template(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut fill_with = String::new();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "--fill-with" => fill_with = args.string(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -f is required"));
    };
    Ok(Box::new(Template { fields, fill_with }))
}

impl Verb for Template {
    fn name(&self) -> &str {
        "template"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let mut shaped = Record::new();
        for field in &self.fields {
            let value = record
                .remove(field)
                .unwrap_or_else(|| Value::from_data(self.fill_with.as_str()));
            shaped.put(field.as_str(), value);
        }
        out.record(shaped, ctx);
    }
}

// ---------------------------------------------------------------------------
// label
// ---------------------------------------------------------------------------

pub const LABEL: VerbSetup = VerbSetup {
    name: "label",
    usage: "\
Usage: recflow label [options] {new1,new2,new3,...}
Given n comma-separated names, renames the first n fields of each record to
have the respective name. (Fields past the nth are left with their original
names.) A later field whose name collides with a new name is dropped.
Example:
 recflow label d,x,f sends \"a=1,b=2,c=3,d=4\" to \"d=1,x=2,f=3\".",
    parse: parse_label,
    ignores_input: false,
};

/// label - renames fields by position.
struct Label {
    names: Vec<String>,
}

fn parse_label(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    if let Some(flag) = args.next_flag()? {
        return Err(args.unknown(flag));
    }
    let names = split_fields(args.positional("new-name list")?);
    let unique: HashSet<&String> = names.iter().collect();
    if unique.len() != names.len() {
        return Err(args.error("labels must be unique"));
    }
    Ok(Box::new(Label { names }))
}

impl Verb for Label {
    fn name(&self) -> &str {
        "label"
    }

    fn process(
        &mut self,
        record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let mut labeled = Record::new();
        for (i, (key, value)) in record.iter().enumerate() {
            match self.names.get(i) {
                Some(name) => labeled.put(name.as_str(), value.clone()),
                None if !self.names.iter().any(|n| n == key) => labeled.put(key, value.clone()),
                None => {}
            }
        }
        out.record(labeled, ctx);
    }
}

// ---------------------------------------------------------------------------
// sort-within-records
// ---------------------------------------------------------------------------

pub const SORT_WITHIN_RECORDS: VerbSetup = VerbSetup {
    name: "sort-within-records",
    usage: "\
Usage: recflow sort-within-records [options]
Outputs records sorted lexically ascending by keys.
Options:
 -r  Sort descending rather than ascending.",
    parse: parse_sort_within_records,
    ignores_input: false,
};

/// sort-within-records - orders each record's fields by key.
struct SortWithinRecords {
    descending: bool,
}

fn parse_sort_within_records(
    args: &mut VerbArgs<'_>,
    _config: &VerbConfig,
) -> Result<Box<dyn Verb>> {
    let mut descending = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-r" => descending = true,
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(SortWithinRecords { descending }))
}

impl Verb for SortWithinRecords {
    fn name(&self) -> &str {
        "sort-within-records"
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        record.sort_keys(self.descending);
        out.record(record, ctx);
    }
}

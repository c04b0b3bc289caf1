//! Counting verbs. All of them emit their results at end of stream.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

/// Occurrence counts keyed by grouping key, with the values that formed
/// each key, in first-seen order.
#[derive(Default)]
struct Tally {
    groups: IndexMap<String, (Vec<Value>, i64)>,
}

impl Tally {
    /// Count `record` under `fields`. Returns false if a field is missing.
    fn add(&mut self, record: &Record, fields: &[String]) -> bool {
        let Some(key) = record.grouping_key(fields) else {
            return false;
        };
        match self.groups.get_mut(&key) {
            Some((_, count)) => *count += 1,
            None => {
                let values = record.selected_values(fields).unwrap_or_default();
                self.groups.insert(key, (values, 1));
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.groups.len()
    }

    /// One record per group: the grouping fields, then the count if
    /// `count_field` is given.
    fn records<'a>(
        &'a self,
        fields: &'a [String],
        count_field: Option<&'a str>,
    ) -> impl Iterator<Item = Record> + 'a {
        self.groups.values().map(move |(values, count)| {
            let mut record: Record = fields.iter().cloned().zip(values.iter().cloned()).collect();
            if let Some(name) = count_field {
                record.put(name, Value::from_int(*count));
            }
            record
        })
    }
}

fn single(field: &str, count: i64) -> Record {
    [(field, Value::from_int(count))].into_iter().collect()
}

// ---------------------------------------------------------------------------
// count
// ---------------------------------------------------------------------------

pub const COUNT: VerbSetup = VerbSetup {
    name: "count",
    usage: "\
Usage: recflow count [options]
Prints number of records, optionally grouped by distinct values for specified field names.
Options:
 -d         Print distinct values for the group-by fields, without counts.
 -n         Show only the number of distinct values. Not interesting without -g.
 -o {name}  Field name for output-count. Default \"count\".
 -g {a,b,c} Optional group-by-field names for counts, e.g. a,b,c",
    parse: parse_count,
    ignores_input: false,
};

/// count - counts records, overall or per group.
struct Count {
    group_by: Option<Vec<String>>,
    distinct_only: bool,
    number_only: bool,
    output: String,
    total: i64,
    tally: Tally,
}

fn parse_count(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut group_by = None;
    let mut distinct_only = false;
    let mut number_only = false;
    let mut output = "count".to_string();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-g" => group_by = Some(args.fields(flag)?),
            "-d" => distinct_only = true,
            "-n" => number_only = true,
            "-o" => output = args.string(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    Ok(Box::new(Count {
        group_by,
        distinct_only,
        number_only,
        output,
        total: 0,
        tally: Tally::default(),
    }))
}

impl Verb for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn process(&mut self, record: Record, _: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        match &self.group_by {
            None => self.total += 1,
            Some(fields) => {
                self.tally.add(&record, fields);
            }
        }
    }

    fn finish(&mut self, ctx: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        let Some(fields) = &self.group_by else {
            out.record(single(&self.output, self.total), ctx);
            return;
        };
        if self.number_only {
            out.record(single(&self.output, self.tally.len() as i64), ctx);
            return;
        }
        let count_field = (!self.distinct_only).then_some(self.output.as_str());
        for record in self.tally.records(fields, count_field) {
            out.record(record, ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// count-distinct
// ---------------------------------------------------------------------------

pub const COUNT_DISTINCT: VerbSetup = VerbSetup {
    name: "count-distinct",
    usage: "\
Usage: recflow count-distinct [options]
Prints number of records having distinct values for specified field names.
Same as uniq -c.
Options:
 -f {a,b,c} Field names for distinct count. Required.
 -n         Show only the number of distinct values.
 -o {name}  Field name for output count. Default \"count\".",
    parse: parse_count_distinct,
    ignores_input: false,
};

/// count-distinct - counts each distinct combination of field values.
struct CountDistinct {
    fields: Vec<String>,
    number_only: bool,
    output: String,
    tally: Tally,
}

fn parse_count_distinct(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut number_only = false;
    let mut output = "count".to_string();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "-n" => number_only = true,
            "-o" => output = args.string(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -f is required"));
    };
    Ok(Box::new(CountDistinct {
        fields,
        number_only,
        output,
        tally: Tally::default(),
    }))
}

impl Verb for CountDistinct {
    fn name(&self) -> &str {
        "count-distinct"
    }

    fn process(&mut self, record: Record, _: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        self.tally.add(&record, &self.fields);
    }

    fn finish(&mut self, ctx: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        if self.number_only {
            out.record(single(&self.output, self.tally.len() as i64), ctx);
            return;
        }
        for record in self.tally.records(&self.fields, Some(&self.output)) {
            out.record(record, ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// most-frequent / least-frequent
// ---------------------------------------------------------------------------

pub const MOST_FREQUENT: VerbSetup = VerbSetup {
    name: "most-frequent",
    usage: "\
Usage: recflow most-frequent [options]
Shows the most frequently occurring distinct values for specified field names.
The first entry is the statistical mode; the remaining are runners-up.
Options:
 -f {one or more comma-separated field names}. Required flag.
 -n {count}  Optional flag defaulting to 10.
 -b          Brief output: show only the values, not the counts.
 -o {name}   Field name for output count. Default \"count\".
See also \"recflow least-frequent\".",
    parse: parse_most_frequent,
    ignores_input: false,
};

pub const LEAST_FREQUENT: VerbSetup = VerbSetup {
    name: "least-frequent",
    usage: "\
Usage: recflow least-frequent [options]
Shows the least frequently occurring distinct values for specified field names.
The first entry is the statistical anti-mode; the remaining are runners-up.
Options:
 -f {one or more comma-separated field names}. Required flag.
 -n {count}  Optional flag defaulting to 10.
 -b          Brief output: show only the values, not the counts.
 -o {name}   Field name for output count. Default \"count\".
See also \"recflow most-frequent\".",
    parse: parse_least_frequent,
    ignores_input: false,
};

/// most-frequent / least-frequent - the top n value combinations by count.
struct Frequent {
    name: &'static str,
    fields: Vec<String>,
    limit: usize,
    brief: bool,
    output: String,
    descending: bool,
    tally: Tally,
}

fn parse_most_frequent(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_frequent(args, true)
}

fn parse_least_frequent(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_frequent(args, false)
}

fn parse_frequent(args: &mut VerbArgs<'_>, descending: bool) -> Result<Box<dyn Verb>> {
    let mut fields = None;
    let mut limit = 10;
    let mut brief = false;
    let mut output = "count".to_string();
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => fields = Some(args.fields(flag)?),
            "-n" => limit = args.count(flag)? as usize,
            "-b" => brief = true,
            "-o" => output = args.string(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(fields) = fields else {
        return Err(args.error("option -f is required"));
    };
    Ok(Box::new(Frequent {
        name: args.verb(),
        fields,
        limit,
        brief,
        output,
        descending,
        tally: Tally::default(),
    }))
}

impl Verb for Frequent {
    fn name(&self) -> &str {
        self.name
    }

    fn process(&mut self, record: Record, _: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {
        self.tally.add(&record, &self.fields);
    }

    fn finish(&mut self, ctx: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        let mut ranked: Vec<&(Vec<Value>, i64)> = self.tally.groups.values().collect();
        // Stable, so ties keep first-seen order.
        if self.descending {
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
        } else {
            ranked.sort_by(|a, b| a.1.cmp(&b.1));
        }
        for (values, count) in ranked.into_iter().take(self.limit) {
            let mut record: Record = self
                .fields
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();
            if !self.brief {
                record.put(self.output.as_str(), Value::from_int(*count));
            }
            out.record(record, ctx);
        }
    }
}

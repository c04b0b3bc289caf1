//! Explode delimited field values into records or fields, or implode them
//! back.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::Result;
use crate::record::{GROUP_SEPARATOR, Record};
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

pub const NEST: VerbSetup = VerbSetup {
    name: "nest",
    usage: "\
Usage: recflow nest [options]
Explodes specified field values into separate fields/records, or reverses this.
Options:
  --explode,--implode   One is required.
  --values,--pairs      One is required.
  --across-records,--across-fields One is required.
  -f {field name}       Required.
  --nested-fs {string}  Defaults to \";\". Field separator for nested values.
  --nested-ps {string}  Defaults to \":\". Pair separator for nested key-value pairs.
  --evar {string}       Shorthand for --explode --values --across-records --nested-fs {string}
  --ivar {string}       Shorthand for --implode --values --across-records --nested-fs {string}

Examples:

  recflow nest --explode --values --across-records -f x
  with input record \"x=a;b;c,y=d\" produces output records
    \"x=a,y=d\"
    \"x=b,y=d\"
    \"x=c,y=d\"
  Use --implode to do the reverse.

  recflow nest --explode --values --across-fields -f x
  with input record \"x=a;b;c,y=d\" produces output records
    \"x_1=a,x_2=b,x_3=c,y=d\"
  Use --implode to do the reverse.

  recflow nest --explode --pairs --across-records -f x
  with input record \"x=a:1;b:2;c:3,y=d\" produces output records
    \"a=1,y=d\"
    \"b=2,y=d\"
    \"c=3,y=d\"

  recflow nest --explode --pairs --across-fields -f x
  with input record \"x=a:1;b:2;c:3,y=d\" produces output records
    \"a=1,b=2,c=3,y=d\"

Notes:
* With --pairs, --implode doesn't make sense since the original field name has
  been lost.
* The combination \"--implode --values --across-records\" is non-streaming:
  no output records are produced until all input records have been read.
  All other flag combinations stream.",
    parse: parse_nest,
    ignores_input: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ExplodeValuesAcrossRecords,
    ExplodeValuesAcrossFields,
    ExplodePairsAcrossRecords,
    ExplodePairsAcrossFields,
    ImplodeValuesAcrossRecords,
    ImplodeValuesAcrossFields,
}

struct Bucket {
    representative: (Record, Context),
    values: Vec<String>,
}

/// nest - splits or joins one field on a nested separator.
struct Nest {
    mode: Mode,
    field: String,
    fs: String,
    ps: String,
    /// For implode across records: buckets keyed by the other fields.
    buckets: IndexMap<String, Bucket>,
}

fn parse_nest(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut field = None;
    let mut fs = ";".to_string();
    let mut ps = ":".to_string();
    let mut explode = None;
    let mut pairs = None;
    let mut across_fields = None;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => field = Some(args.string(flag)?),
            "--explode" => explode = Some(true),
            "--implode" => explode = Some(false),
            "--values" => pairs = Some(false),
            "--pairs" => pairs = Some(true),
            "--across-records" => across_fields = Some(false),
            "--across-fields" => across_fields = Some(true),
            "--nested-fs" => fs = args.string(flag)?,
            "--nested-ps" => ps = args.string(flag)?,
            "--evar" | "--ivar" => {
                fs = args.string(flag)?;
                explode = Some(flag == "--evar");
                pairs = Some(false);
                across_fields = Some(false);
            }
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(field) = field else {
        return Err(args.error("option -f is required"));
    };
    let Some(explode) = explode else {
        return Err(args.error("--explode or --implode is required"));
    };
    let Some(pairs) = pairs else {
        return Err(args.error("--values or --pairs is required"));
    };
    let Some(across_fields) = across_fields else {
        return Err(args.error("--across-records or --across-fields is required"));
    };
    let mode = match (explode, pairs, across_fields) {
        (true, false, false) => Mode::ExplodeValuesAcrossRecords,
        (true, false, true) => Mode::ExplodeValuesAcrossFields,
        (true, true, false) => Mode::ExplodePairsAcrossRecords,
        (true, true, true) => Mode::ExplodePairsAcrossFields,
        (false, false, false) => Mode::ImplodeValuesAcrossRecords,
        (false, false, true) => Mode::ImplodeValuesAcrossFields,
        (false, true, _) => return Err(args.error("--implode with --pairs doesn't make sense")),
    };
    Ok(Box::new(Nest {
        mode,
        field,
        fs,
        ps,
        buckets: IndexMap::new(),
    }))
}

/// Copy of `record` with `field` replaced, in place, by `replacement`.
fn splice(record: &Record, field: &str, replacement: Vec<(String, Value)>) -> Record {
    let mut replacement = Some(replacement);
    let mut out = Record::new();
    for (key, value) in record {
        if key != field {
            out.put(key, value.clone());
        } else if let Some(entries) = replacement.take() {
            for (new_key, new_value) in entries {
                out.put(new_key, new_value);
            }
        }
    }
    out
}

impl Nest {
    fn pair(&self, piece: &str) -> (String, Value) {
        match piece.split_once(self.ps.as_str()) {
            Some((key, value)) => (key.to_string(), Value::from_data(value)),
            None => (self.field.clone(), Value::from_data(piece)),
        }
    }

    /// Pieces of a nested pair list; an empty value has none.
    fn pair_pieces<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.split(self.fs.as_str()).filter(move |_| !text.is_empty())
    }

    fn is_exploded_name(&self, key: &str) -> bool {
        key.strip_prefix(self.field.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    fn implode_across_fields(&self, record: &Record) -> Record {
        let joined = record
            .iter()
            .filter(|(key, _)| self.is_exploded_name(key))
            .map(|(_, value)| value.to_string())
            .collect::<Vec<_>>()
            .join(&self.fs);
        let mut out = Record::new();
        let mut placed = false;
        for (key, value) in record {
            if !self.is_exploded_name(key) {
                out.put(key, value.clone());
            } else if !placed {
                out.put(self.field.as_str(), Value::from_data(joined.as_str()));
                placed = true;
            }
        }
        out
    }

    fn bucket_key(&self, record: &Record) -> String {
        let mut key = String::new();
        for (name, value) in record {
            if name != self.field {
                key.push_str(name);
                key.push(GROUP_SEPARATOR);
                key.push_str(&value.to_string());
                key.push(GROUP_SEPARATOR);
            }
        }
        key
    }
}

impl Verb for Nest {
    fn name(&self) -> &str {
        "nest"
    }

    fn process(
        &mut self,
        record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        if self.mode == Mode::ImplodeValuesAcrossFields {
            out.record(self.implode_across_fields(&record), ctx);
            return;
        }
        let Some(text) = record.get(&self.field).map(Value::to_string) else {
            out.record(record, ctx);
            return;
        };
        match self.mode {
            Mode::ExplodeValuesAcrossRecords => {
                for piece in text.split(self.fs.as_str()) {
                    let mut copy = record.clone();
                    copy.put(self.field.as_str(), Value::from_data(piece));
                    out.record(copy, ctx);
                }
            }
            Mode::ExplodeValuesAcrossFields => {
                let entries = text
                    .split(self.fs.as_str())
                    .enumerate()
                    .map(|(i, piece)| (format!("{}_{}", self.field, i + 1), Value::from_data(piece)))
                    .collect();
                out.record(splice(&record, &self.field, entries), ctx);
            }
            Mode::ExplodePairsAcrossRecords => {
                for piece in self.pair_pieces(&text) {
                    out.record(splice(&record, &self.field, vec![self.pair(piece)]), ctx);
                }
            }
            Mode::ExplodePairsAcrossFields => {
                let entries = self.pair_pieces(&text).map(|p| self.pair(p)).collect();
                out.record(splice(&record, &self.field, entries), ctx);
            }
            Mode::ImplodeValuesAcrossRecords => {
                let key = self.bucket_key(&record);
                match self.buckets.get_mut(&key) {
                    Some(bucket) => bucket.values.push(text),
                    None => {
                        let bucket = Bucket {
                            representative: (record, ctx.clone()),
                            values: vec![text],
                        };
                        self.buckets.insert(key, bucket);
                    }
                }
            }
            Mode::ImplodeValuesAcrossFields => {}
        }
    }

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        for (_, bucket) in self.buckets.drain(..) {
            let (mut record, ctx) = bucket.representative;
            record.put(self.field.as_str(), Value::from_data(bucket.values.join(&self.fs)));
            out.record(record, &ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::verbs::testing::*;

    #[test]
    fn test_explode_values_across_records() {
        let out = run("nest --explode --values --across-records -f x", "x=a;b;c,y=d");
        assert_eq!(out, "x=a,y=d\nx=b,y=d\nx=c,y=d");
        assert_eq!(run("nest --evar | -f x", "x=a|b,y=d\nz=3"), "x=a,y=d\nx=b,y=d\nz=3");
    }

    #[test]
    fn test_explode_values_across_fields() {
        let out = run("nest --explode --values --across-fields -f x", "w=0,x=a;b;c,y=d");
        assert_eq!(out, "w=0,x_1=a,x_2=b,x_3=c,y=d");
        let out = run("nest --explode --values --across-fields -f x", "x=");
        assert_eq!(out, "x_1=");
    }

    #[test]
    fn test_explode_pairs() {
        let input = "x=a:1;b:2;c,y=d";
        let out = run("nest --explode --pairs --across-records -f x", input);
        assert_eq!(out, "a=1,y=d\nb=2,y=d\nx=c,y=d");
        let out = run("nest --explode --pairs --across-fields -f x", input);
        assert_eq!(out, "a=1,b=2,x=c,y=d");
    }

    #[test]
    fn test_implode_values_across_fields() {
        let out = run(
            "nest --implode --values --across-fields -f x",
            "w=0,x_1=a,x_2=b,y=d,x_3=c",
        );
        assert_eq!(out, "w=0,x=a;b;c,y=d");
    }

    #[test]
    fn test_implode_values_across_records() {
        let input = "x=a,y=d\nx=b,y=d\nz=9\nx=c,y=e\nx=e,y=d";
        let out = run("nest --ivar ; -f x", input);
        assert_eq!(out, "z=9\nx=a;b;e,y=d\nx=c,y=e");
    }

    #[test]
    fn test_nest_round_trip() {
        let input = "x=a;b;c,y=d";
        let out = run("nest --evar ; -f x then nest --ivar ; -f x", input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_nest_argument_errors() {
        let build = |chain| crate::verbs::build_chain(&segments(chain)).err().unwrap().to_string();
        assert_eq!(build("nest --explode --values -f x"), "nest: --across-records or --across-fields is required");
        assert_eq!(
            build("nest --implode --pairs --across-fields -f x"),
            "nest: --implode with --pairs doesn't make sense"
        );
    }
}

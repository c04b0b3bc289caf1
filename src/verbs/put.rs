//! `put` and `filter`: the scripted verbs.

use crate::context::Context;
use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::script::{Interpreter, MainOutcome, Output, flatten_into, parse_program};
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

macro_rules! script_options {
    () => {
        "
Options:
 -f {file name} File containing a program. May be given more than once; the
                files are concatenated.
 -e {expression} Program text. May be given more than once, and mixed with -f.
                Without -f or -e the program is the first positional argument.
 -s name=value: Predefines out-of-stream variable @name with value \"value\".
 -x            Prints records for which {expression} evaluates to false.
 -q            Does not include the modified record in the output stream.
               Useful when all output is via emit, tee or print.
 -S, -F        Accepted for compatibility; no effect.
Map-valued fields are flattened on output, joining keys with \".\"."
    };
}

pub const PUT: VerbSetup = VerbSetup {
    name: "put",
    usage: concat!(
        "Usage: recflow put [options] {expression}
Lets you assign new field names, modify existing ones, and emit or print
other output. A bare-boolean statement or the filter keyword decides whether
the record is passed along.
Example: recflow put '$z = $x . \"_\" . $y; filter $z != \"\"'",
        script_options!()
    ),
    parse: parse_put,
    ignores_input: false,
};

pub const FILTER: VerbSetup = VerbSetup {
    name: "filter",
    usage: concat!(
        "Usage: recflow filter [options] {expression}
Prints records for which {expression} evaluates to true. The expression is
the same language as put; assignments are allowed and take effect, and the
last bare-boolean statement decides the outcome.
Example: recflow filter '$x > 0.5 && $b == \"pan\"'",
        script_options!()
    ),
    parse: parse_filter,
    ignores_input: false,
};

/// put / filter - runs a program against each record.
struct Put {
    name: &'static str,
    interpreter: Interpreter,
    /// `filter` keeps records by the last bare boolean; `put` keeps them
    /// unless the program filters them out.
    is_filter: bool,
    invert: bool,
    suppress: bool,
    begun: bool,
}

fn parse_put(args: &mut VerbArgs<'_>, config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_script(args, config, false)
}

fn parse_filter(args: &mut VerbArgs<'_>, config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_script(args, config, true)
}

fn parse_script(args: &mut VerbArgs<'_>, config: &VerbConfig, is_filter: bool) -> Result<Box<dyn Verb>> {
    let mut sources: Vec<String> = Vec::new();
    let mut presets: Vec<(String, Value)> = Vec::new();
    let mut invert = false;
    let mut suppress = false;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => {
                let path = args.value(flag)?;
                let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Open {
                    path: path.to_string(),
                    source,
                })?;
                sources.push(text);
            }
            "-e" => sources.push(args.string(flag)?),
            "-s" => {
                let assignment = args.value(flag)?;
                let Some((name, value)) = assignment.split_once('=') else {
                    return Err(args.error(format!("-s: expected name=value, got \"{assignment}\"")));
                };
                presets.push((name.to_string(), Value::from_data(value)));
            }
            "-x" => invert = true,
            "-q" => suppress = true,
            "-S" | "-F" => {}
            _ => return Err(args.unknown(flag)),
        }
    }
    if sources.is_empty() {
        sources.push(args.positional("expression")?.to_string());
    }
    let program = parse_program(&sources.join("\n"))?;
    let mut interpreter = Interpreter::new(program, config.seed);
    for (name, value) in presets {
        interpreter.set_oosvar(&name, value);
    }
    Ok(Box::new(Put {
        name: args.verb(),
        interpreter,
        is_filter,
        invert,
        suppress,
        begun: false,
    }))
}

fn emit_outputs(outputs: Vec<Output>, ctx: &Context, out: &mut Emitter<'_>) {
    for output in outputs {
        match output {
            Output::Text(text) => out.text(text, ctx),
            Output::Record(record) => out.record(record, ctx),
        }
    }
}

/// Replace map-valued fields by their flattened entries, in place.
fn flatten(record: Record) -> Record {
    if !record.values().any(|v| v.as_map().is_some()) {
        return record;
    }
    let mut flat = Record::new();
    for (key, value) in &record {
        flatten_into(key, value, &mut flat);
    }
    flat
}

impl Put {
    fn begin(&mut self, ctx: &Context, out: &mut Emitter<'_>) {
        if self.begun {
            return;
        }
        self.begun = true;
        if self.interpreter.has_begin() {
            let outputs = self.interpreter.run_begin(ctx);
            emit_outputs(outputs, ctx, out);
        }
    }

    fn keeps(&self, outcome: &MainOutcome) -> bool {
        let keep = if self.is_filter {
            outcome.filter.or(outcome.bare).unwrap_or(true)
        } else {
            outcome.filter.unwrap_or(true)
        };
        keep != self.invert
    }
}

impl Verb for Put {
    fn name(&self) -> &str {
        self.name
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        self.begin(&Context::new(), out);
        let outcome = self.interpreter.run_main(&mut record, ctx);
        let keep = self.keeps(&outcome);
        emit_outputs(outcome.outputs, ctx, out);
        if keep && !self.suppress {
            out.record(flatten(record), ctx);
        }
    }

    fn finish(&mut self, ctx: &Context, out: &mut Emitter<'_>, _: &mut CancelLink) {
        self.begin(ctx, out);
        let outputs = self.interpreter.run_end(ctx);
        emit_outputs(outputs, ctx, out);
    }
}

#[cfg(test)]
mod tests {
    use crate::verbs::testing::*;

    #[test]
    fn test_put_assigns() {
        assert_eq!(run_args(&["put", "$z = $a . $b"], "a=1,b=2"), "a=1,b=2,z=12");
        assert_eq!(run_args(&["put", "$i = $i * 10"], "i=3"), "i=30");
        assert_eq!(run_args(&["put", "unset $a"], "a=1,b=2"), "b=2");
    }

    #[test]
    fn test_put_untouched_values_keep_their_text() {
        assert_eq!(run_args(&["put", "$y = 1"], "x=0x1F,z=007"), "x=0x1F,z=007,y=1");
    }

    #[test]
    fn test_put_filter_statement() {
        let out = run_args(&["put", "filter $i > 3"], ABIXY);
        assert_eq!(out.lines().count(), 2);
        let out = run_args(&["put", "-q", "print $a"], ABIXY);
        assert_eq!(out, "pan\neks\nwye\neks\nwye");
    }

    #[test]
    fn test_filter() {
        let out = run_args(&["filter", "$a == \"eks\""], ABIXY);
        assert_eq!(
            out.lines().map(|l| &l[..9]).collect::<Vec<_>>(),
            ["a=eks,b=p", "a=eks,b=w"]
        );
        let out = run_args(&["filter", "-x", "$a == \"eks\""], ABIXY);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_filter_absent_condition_excludes() {
        assert_eq!(run_args(&["filter", "$nosuch > 1"], "a=1\na=2"), "");
    }

    #[test]
    fn test_begin_and_end_blocks() {
        let program = "begin { @sum = 0 } @sum += $i; end { emit @sum }";
        assert_eq!(run_args(&["put", "-q", program], ABIXY), "sum=15");
        let out = run_args(&["put", "begin { print \"start\" } end { print \"done\" }"], "a=1");
        assert_eq!(out, "start\na=1\ndone");
        assert_eq!(run_args(&["put", "begin { print \"start\" }"], ""), "start");
    }

    #[test]
    fn test_preset_oosvars_and_expression_flags() {
        let out = run_args(&["put", "-s", "k=5", "-e", "$y = $x + @k", "-e", "$z = 1"], "x=1");
        assert_eq!(out, "x=1,y=6,z=1");
    }

    #[test]
    fn test_put_program_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"$b = $a * 2\n").unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(run_args(&["put", "-f", path], "a=4"), "a=4,b=8");
    }

    #[test]
    fn test_print_precedes_its_record() {
        let out = run_args(&["put", "print \"before \" . $a"], "a=1\na=2");
        assert_eq!(out, "before 1\na=1\nbefore 2\na=2");
    }

    #[test]
    fn test_script_errors() {
        let err = crate::verbs::build_chain(&[vec!["put".to_string(), "$y = ".to_string()]]);
        assert!(matches!(err, Err(crate::error::PipelineError::Script { .. })));
        assert!(crate::verbs::build_chain(&[vec!["put".to_string()]]).is_err());
    }
}

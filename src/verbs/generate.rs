//! Verbs that produce more records than they consume.

use tracing::debug;

use crate::arithmetic::{greater_than, less_than, plus};
use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::value::Value;
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

// ---------------------------------------------------------------------------
// repeat
// ---------------------------------------------------------------------------

pub const REPEAT: VerbSetup = VerbSetup {
    name: "repeat",
    usage: "\
Usage: recflow repeat [options]
Copies input records to output records multiple times.
Options must be exactly one of the following:
 -n {repeat count}  Repeat each input record this many times.
 -f {field name}    Same, but take the repeat count from the specified
                    field name of each input record. Records lacking the
                    field, or whose value is not an integer, are dropped.
Example:
 echo x=0 | recflow repeat -n 4 then put '$y = urand()'",
    parse: parse_repeat,
    ignores_input: false,
};

enum RepeatCount {
    Fixed(u64),
    FromField(String),
}

/// repeat - emits each record several times.
struct Repeat {
    count: RepeatCount,
}

fn parse_repeat(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut count = None;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-n" => count = Some(RepeatCount::Fixed(args.count(flag)?)),
            "-f" => count = Some(RepeatCount::FromField(args.string(flag)?)),
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(count) = count else {
        return Err(args.error("one of -n or -f is required"));
    };
    Ok(Box::new(Repeat { count }))
}

impl Verb for Repeat {
    fn name(&self) -> &str {
        "repeat"
    }

    fn process(
        &mut self,
        record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        cancel: &mut CancelLink,
    ) {
        let times = match &self.count {
            RepeatCount::Fixed(n) => *n,
            RepeatCount::FromField(field) => {
                match record.get(field).and_then(Value::as_int) {
                    Some(n) if n > 0 => n as u64,
                    _ => return,
                }
            }
        };
        if times == 0 {
            return;
        }
        for _ in 1..times {
            if cancel.relay() || out.is_disconnected() {
                return;
            }
            out.record(record.clone(), ctx);
        }
        out.record(record, ctx);
    }
}

// ---------------------------------------------------------------------------
// seqgen
// ---------------------------------------------------------------------------

pub const SEQGEN: VerbSetup = VerbSetup {
    name: "seqgen",
    usage: "\
Usage: recflow seqgen [options]
Produces a sequence of counters. Discards the input record stream. Produces
output as specified by the options.
Options:
 -f {name}        (default \"i\") Field name for counters.
 --start {value}  (default 1) Inclusive start value.
 --step {value}   (default 1) Step value.
 --stop {value}   (default 100) Inclusive stop value.
Start, stop, and/or step may be floating-point. Output is integer if start,
stop, and step are all integers. Step may be negative. It may not be zero
unless start == stop, in which case one record is produced.
Example:
 recflow seqgen --start 1 --stop 10 then put '$y = $i ** 2'",
    parse: parse_seqgen,
    ignores_input: true,
};

/// seqgen - generates a counter sequence at end of stream.
struct Seqgen {
    field: String,
    start: Value,
    stop: Value,
    step: Value,
    direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Once,
}

fn parse_seqgen(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    let mut field = "i".to_string();
    let mut start = "1";
    let mut stop = "100";
    let mut step = "1";
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => field = args.string(flag)?,
            "--start" => start = args.value(flag)?,
            "--stop" => stop = args.value(flag)?,
            "--step" => step = args.value(flag)?,
            _ => return Err(args.unknown(flag)),
        }
    }
    let number = |text: &str| {
        let value = Value::from_data(text);
        match value.as_number() {
            Some(n) => Ok((value, n)),
            None => Err(args.error(format!("value should be a number; got \"{text}\""))),
        }
    };
    let (start, from) = number(start)?;
    let (stop, to) = number(stop)?;
    let (step, by) = number(step)?;
    let direction = if by > 0.0 {
        Direction::Up
    } else if by < 0.0 {
        Direction::Down
    } else if from == to {
        Direction::Once
    } else {
        return Err(args.error("step must not be zero unless start == stop"));
    };
    Ok(Box::new(Seqgen {
        field,
        start,
        stop,
        step,
        direction,
    }))
}

impl Seqgen {
    fn done(&self, counter: &Value, emitted: u64) -> bool {
        match self.direction {
            Direction::Up => greater_than(counter, &self.stop).as_bool() != Some(false),
            Direction::Down => less_than(counter, &self.stop).as_bool() != Some(false),
            Direction::Once => emitted > 0,
        }
    }
}

impl Verb for Seqgen {
    fn name(&self) -> &str {
        "seqgen"
    }

    fn process(&mut self, _: Record, _: &Context, _: &mut Emitter<'_>, _: &mut CancelLink) {}

    fn finish(&mut self, _: &Context, out: &mut Emitter<'_>, cancel: &mut CancelLink) {
        let mut ctx = Context::new();
        ctx.start_file("seqgen");
        let mut counter = self.start.clone();
        let mut emitted = 0;
        while !self.done(&counter, emitted) {
            if cancel.relay() || out.is_disconnected() {
                debug!(emitted, "seqgen cancelled");
                return;
            }
            let mut record = Record::new();
            record.put(self.field.as_str(), counter.clone());
            out.record(record, &ctx.advance());
            emitted += 1;
            counter = plus(&counter, &self.step);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::verbs::testing::*;

    #[test]
    fn test_repeat() {
        assert_eq!(run("repeat -n 3", "a=1\nb=2"), "a=1\na=1\na=1\nb=2\nb=2\nb=2");
        assert_eq!(run("repeat -n 0", "a=1"), "");
    }

    #[test]
    fn test_repeat_from_field() {
        let out = run("repeat -f n", "n=2,x=a\nn=0,x=b\nx=c\nn=abc\nn=1,x=d");
        assert_eq!(out, "n=2,x=a\nn=2,x=a\nn=1,x=d");
    }

    #[test]
    fn test_seqgen() {
        assert_eq!(run("seqgen --stop 3", ""), "i=1\ni=2\ni=3");
        assert_eq!(
            run("seqgen -f j --start 10 --stop 1 --step -4", "ignored=1"),
            "j=10\nj=6\nj=2"
        );
        assert_eq!(run("seqgen --start 5 --stop 5 --step 0", ""), "i=5");
        assert_eq!(run("seqgen --start 1 --stop 0", ""), "");
    }

    #[test]
    fn test_seqgen_floats() {
        assert_eq!(
            run("seqgen --start 1 --stop 2 --step 0.25", ""),
            "i=1\ni=1.25\ni=1.5\ni=1.75\ni=2"
        );
    }

    #[test]
    fn test_seqgen_context() {
        let out = run("seqgen --stop 2 then put $n=NR.\":\".FILENAME", "");
        assert_eq!(out, "i=1,n=1:seqgen\ni=2,n=2:seqgen");
    }

    #[test]
    fn test_seqgen_rejects_bad_arguments() {
        assert!(crate::verbs::build_chain(&segments("seqgen --stop x")).is_err());
        assert!(crate::verbs::build_chain(&segments("seqgen --step 0")).is_err());
    }
}

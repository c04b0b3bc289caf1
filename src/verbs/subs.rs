//! `sub`, `gsub` and `ssub` as verbs: string replacement across fields.

use std::collections::HashSet;

use regex::Regex;

use crate::context::Context;
use crate::error::Result;
use crate::record::Record;
use crate::script::functions::{Runtime, call};
use crate::value::{TypeTag, Value};
use crate::verb::{CancelLink, Emitter, Verb, VerbArgs, VerbConfig, VerbSetup};

use super::regex_arg;

macro_rules! subs_options {
    () => {
        "
Options:
 -f {a,b,c}  Field names to convert.
 -r {regex}  Regular expression for field names to convert.
 -a          Convert all fields.
Only string values are modified; numbers pass through unchanged."
    };
}

pub const SUB: VerbSetup = VerbSetup {
    name: "sub",
    usage: concat!(
        "Usage: recflow sub [options] {old} {new}
Replaces old string with new string in specified field(s), with regex support
for the old string and not handling multiple matches, like the `sub` function
of put. See also the `gsub` and `ssub` verbs.",
        subs_options!()
    ),
    parse: parse_sub,
    ignores_input: false,
};

pub const GSUB: VerbSetup = VerbSetup {
    name: "gsub",
    usage: concat!(
        "Usage: recflow gsub [options] {old} {new}
Replaces old string with new string in specified field(s), with regex support
for the old string and handling multiple matches, like the `gsub` function
of put. See also the `sub` and `ssub` verbs.",
        subs_options!()
    ),
    parse: parse_gsub,
    ignores_input: false,
};

pub const SSUB: VerbSetup = VerbSetup {
    name: "ssub",
    usage: concat!(
        "Usage: recflow ssub [options] {old} {new}
Replaces old string with new string in specified field(s), without regex support
for the old string, like the `ssub` function of put. See also the `gsub` and
`sub` verbs.",
        subs_options!()
    ),
    parse: parse_ssub,
    ignores_input: false,
};

enum FieldSelection {
    Names(HashSet<String>),
    Patterns(Vec<Regex>),
    All,
}

impl FieldSelection {
    fn accepts(&self, key: &str) -> bool {
        match self {
            FieldSelection::Names(names) => names.contains(key),
            FieldSelection::Patterns(patterns) => patterns.iter().any(|re| re.is_match(key)),
            FieldSelection::All => true,
        }
    }
}

/// sub / gsub / ssub - applies the same-named function to selected fields.
struct Subs {
    function: &'static str,
    selection: FieldSelection,
    old: Value,
    new: Value,
    runtime: Runtime,
}

fn parse_sub(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_subs(args)
}

fn parse_gsub(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_subs(args)
}

fn parse_ssub(args: &mut VerbArgs<'_>, _config: &VerbConfig) -> Result<Box<dyn Verb>> {
    parse_subs(args)
}

fn parse_subs(args: &mut VerbArgs<'_>) -> Result<Box<dyn Verb>> {
    let mut selection = None;
    while let Some(flag) = args.next_flag()? {
        match flag {
            "-f" => {
                let names = args.fields(flag)?.into_iter().collect();
                selection = Some(FieldSelection::Names(names));
            }
            "-r" => {
                let patterns = args.fields(flag)?;
                let cursor = &*args;
                let patterns = patterns
                    .iter()
                    .map(|p| regex_arg(cursor, p))
                    .collect::<Result<Vec<_>>>()?;
                selection = Some(FieldSelection::Patterns(patterns));
            }
            "-a" => selection = Some(FieldSelection::All),
            _ => return Err(args.unknown(flag)),
        }
    }
    let Some(selection) = selection else {
        return Err(args.error("one of -f, -r or -a is required"));
    };
    let old = args.positional("old string")?;
    let new = args.positional("new string")?;
    Ok(Box::new(Subs {
        function: args.verb(),
        selection,
        old: Value::from_string(old),
        new: Value::from_string(new),
        runtime: Runtime::new(None),
    }))
}

impl Verb for Subs {
    fn name(&self) -> &str {
        self.function
    }

    fn process(
        &mut self,
        mut record: Record,
        ctx: &Context,
        out: &mut Emitter<'_>,
        _: &mut CancelLink,
    ) {
        let keys: Vec<String> = record
            .iter()
            .filter(|(key, value)| {
                self.selection.accepts(key) && value.type_tag() == TypeTag::String
            })
            .map(|(key, _)| key.to_string())
            .collect();
        for key in keys {
            if let Some(value) = record.get_mut(&key) {
                let args = [value.clone(), self.old.clone(), self.new.clone()];
                *value = call(self.function, &args, &mut self.runtime);
            }
        }
        out.record(record, ctx);
    }
}

#[cfg(test)]
mod tests {
    use crate::verbs::testing::*;

    #[test]
    fn test_sub() {
        assert_eq!(run("sub -f a,b l L", "a=hello,b=all,c=ll"), "a=heLlo,b=aLl,c=ll");
        assert_eq!(run("gsub -f a,b l L", "a=hello,b=all,c=ll"), "a=heLLo,b=aLL,c=ll");
        assert_eq!(run("sub -a ^(.)(.) \\2\\1", "a=abc,b=xyz"), "a=bac,b=yxz");
    }

    #[test]
    fn test_ssub_is_literal() {
        assert_eq!(run("ssub -a . X", "a=a.b.c"), "a=aXb.c");
        assert_eq!(run("gsub -a . X", "a=a.b"), "a=XXX");
    }

    #[test]
    fn test_subs_skip_numbers() {
        assert_eq!(run("gsub -a 1 X", "a=121,b=a1"), "a=121,b=aX");
    }

    #[test]
    fn test_subs_field_regex() {
        assert_eq!(run("gsub -r ^x o 0", "x1=foo,x2=boo,y=zoo"), "x1=f00,x2=b00,y=zoo");
    }

    #[test]
    fn test_subs_argument_errors() {
        assert!(crate::verbs::build_chain(&segments("sub a b")).is_err());
        assert!(crate::verbs::build_chain(&segments("sub -a a")).is_err());
    }
}

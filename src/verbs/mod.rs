//! The verb registry and chain construction.
//!
//! A chain on the command line is a list of segments, one per verb, each
//! holding the verb name followed by its own arguments. Every verb module
//! exports one [`VerbSetup`] per verb; [`VERBS`] collects them.

use regex::Regex;

use crate::error::{PipelineError, Result};
use crate::script::functions::compile_regex;
use crate::verb::{Verb, VerbArgs, VerbConfig, VerbSetup};

mod cat;
mod count;
mod fields;
mod fill;
mod generate;
mod group;
mod head;
mod nest;
mod put;
mod sort;
mod subs;
mod unsparsify;

/// Every registered verb, in listing order.
pub static VERBS: &[VerbSetup] = &[
    cat::CAT,
    count::COUNT,
    count::COUNT_DISTINCT,
    group::COUNT_SIMILAR,
    fields::CUT,
    fill::FILL_DOWN,
    fill::FILL_EMPTY,
    put::FILTER,
    group::GROUP_BY,
    group::GROUP_LIKE,
    subs::GSUB,
    head::HEAD,
    fields::LABEL,
    count::LEAST_FREQUENT,
    count::MOST_FREQUENT,
    nest::NEST,
    cat::NOTHING,
    put::PUT,
    unsparsify::REMOVE_EMPTY_COLUMNS,
    fields::RENAME,
    fields::REORDER,
    generate::REPEAT,
    generate::SEQGEN,
    sort::SHUFFLE,
    sort::SORT,
    fields::SORT_WITHIN_RECORDS,
    subs::SSUB,
    subs::SUB,
    sort::TAC,
    head::TAIL,
    fields::TEMPLATE,
    unsparsify::UNSPARSIFY,
];

/// Compile a regex given as a verb argument.
fn regex_arg(args: &VerbArgs<'_>, pattern: &str) -> Result<Regex> {
    compile_regex(pattern).map_err(|e| args.error(format!("invalid regex \"{pattern}\": {e}")))
}

/// Find a verb by name.
pub fn lookup(name: &str) -> Option<&'static VerbSetup> {
    VERBS.iter().find(|setup| setup.name == name)
}

/// Names of all registered verbs.
pub fn list_verbs() -> impl Iterator<Item = &'static str> {
    VERBS.iter().map(|setup| setup.name)
}

/// Usage text for one verb.
pub fn verb_usage(name: &str) -> Option<&'static str> {
    lookup(name).map(|setup| setup.usage)
}

/// Construct one verb from its segment (`name` followed by arguments).
/// Returns the verb and whatever arguments its parser left unconsumed.
pub fn parse_verb<'a>(
    segment: &'a [String],
    config: &VerbConfig,
) -> Result<(Box<dyn Verb>, &'a [String])> {
    let Some((name, args)) = segment.split_first() else {
        return Err(PipelineError::Usage("empty verb in chain".to_string()));
    };
    let setup = lookup(name).ok_or_else(|| PipelineError::UnknownVerb(name.clone()))?;
    let mut cursor = VerbArgs::new(setup, args);
    let verb = (setup.parse)(&mut cursor, config)?;
    Ok((verb, cursor.rest()))
}

/// Whether the chain starts with a verb that generates its own records.
pub fn leads_with_generator(segments: &[Vec<String>]) -> bool {
    segments
        .first()
        .and_then(|segment| segment.first())
        .and_then(|name| lookup(name))
        .is_some_and(|setup| setup.ignores_input)
}

/// Build a chain in which every segment must be consumed entirely.
pub fn build_chain_with(
    segments: &[Vec<String>],
    config: &VerbConfig,
) -> Result<Vec<Box<dyn Verb>>> {
    let mut verbs = Vec::with_capacity(segments.len());
    for segment in segments {
        let (verb, rest) = parse_verb(segment, config)?;
        if let Some(extra) = rest.first() {
            return Err(PipelineError::verb(
                verb.name(),
                format!("unexpected argument \"{extra}\""),
            ));
        }
        verbs.push(verb);
    }
    Ok(verbs)
}

/// [`build_chain_with`] under the default configuration.
pub fn build_chain(segments: &[Vec<String>]) -> Result<Vec<Box<dyn Verb>>> {
    build_chain_with(segments, &VerbConfig::default())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for driving verbs with DKVP text in unit tests.

    use super::*;
    use crate::context::{Context, Envelope};
    use crate::executor::run_serial;
    use crate::input::DkvpReader;

    pub fn segments(chain: &str) -> Vec<Vec<String>> {
        chain
            .split(" then ")
            .map(|seg| seg.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    /// Run `verbs` over DKVP `input` lines; render records as DKVP, text
    /// envelopes verbatim, one per line.
    pub fn run_verbs(verbs: &mut [Box<dyn Verb>], input: &str) -> String {
        let reader = DkvpReader::new(",", "=");
        let mut ctx = Context::new();
        ctx.start_file("test.dkvp");
        let mut envelopes = Vec::new();
        for line in input.lines().filter(|l| !l.is_empty()) {
            envelopes.push(Envelope::Record(reader.parse_line(line), ctx.advance()));
        }
        envelopes.push(Envelope::EndOfStream(ctx));
        run_serial(envelopes, verbs)
            .iter()
            .filter_map(|e| match e {
                Envelope::Record(r, _) => Some(r.to_string()),
                Envelope::Text(t, _) => Some(t.clone()),
                Envelope::EndOfStream(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build `chain` (verbs joined by " then ", arguments split on
    /// whitespace) and run it.
    pub fn run(chain: &str, input: &str) -> String {
        let mut verbs = build_chain(&segments(chain)).unwrap();
        run_verbs(&mut verbs, input)
    }

    /// Like [`run`] but with arguments given as a list, for arguments that
    /// contain spaces.
    pub fn run_args(args: &[&str], input: &str) -> String {
        let segment: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut verbs = build_chain(&[segment]).unwrap();
        run_verbs(&mut verbs, input)
    }

    pub const ABIXY: &str = "\
a=pan,b=pan,i=1,x=0.3467901443380824,y=0.7268028627434533
a=eks,b=pan,i=2,x=0.7586799647899636,y=0.5221511083334797
a=wye,b=wye,i=3,x=0.20460330576630303,y=0.33831852551664776
a=eks,b=wye,i=4,x=0.38139939387114097,y=0.13418874328430463
a=wye,b=pan,i=5,x=0.5732889198020006,y=0.8636244699032729
";
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_registry_names_are_unique_and_sorted() {
        let names: Vec<&str> = list_verbs().collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_unknown_verb() {
        let err = build_chain(&segments("frobnicate -x")).err().unwrap();
        assert_eq!(err.to_string(), "verb \"frobnicate\" not found");
    }

    #[test]
    fn test_leftover_arguments_rejected() {
        let err = build_chain(&segments("head -n 1 extra")).err().unwrap();
        assert_eq!(err.to_string(), "head: unexpected argument \"extra\"");
    }

    #[test]
    fn test_parse_verb_returns_rest() {
        let segment: Vec<String> = ["cat", "-n", "a.dkvp", "b.dkvp"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (verb, rest) = parse_verb(&segment, &VerbConfig::default()).unwrap();
        assert_eq!(verb.name(), "cat");
        assert_eq!(rest, &segment[2..]);
    }

    #[test]
    fn test_unknown_option() {
        let err = build_chain(&segments("tac --bogus")).err().unwrap();
        assert!(err.to_string().starts_with("tac: option \"--bogus\" not recognized"));
    }

    #[test]
    fn test_leads_with_generator() {
        assert!(leads_with_generator(&segments("seqgen --stop 3 then cat")));
        assert!(!leads_with_generator(&segments("cat then seqgen --stop 3")));
        assert!(!leads_with_generator(&[]));
    }

    #[test]
    fn test_every_verb_has_usage() {
        for setup in VERBS {
            assert!(
                setup.usage.starts_with(&format!("Usage: recflow {}", setup.name)),
                "{}",
                setup.name
            );
        }
    }

    // Scenario: `head -n 1` on a large input yields exactly the first record.
    #[test]
    fn test_head_one() {
        assert_eq!(
            run("head -n 1", ABIXY),
            "a=pan,b=pan,i=1,x=0.3467901443380824,y=0.7268028627434533"
        );
    }

    // Scenario: reversing twice restores the original order.
    #[test]
    fn test_reverse_twice() {
        assert_eq!(run("tac then tac", ABIXY), ABIXY.trim_end());
    }

    // Scenario: records with equal schemas come out together, in first-seen
    // order of their schema.
    #[test]
    fn test_group_by_schema() {
        let input = "a=1,b=2\nc=3\na=4,b=5\nc=6\nd=7\n";
        assert_eq!(run("group-like", input), "a=1,b=2\na=4,b=5\nc=3\nc=6\nd=7");
    }
}

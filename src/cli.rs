//! Main command line: global options, the `then`-chain, and input names.
//!
//! ```text
//! recflow [options] verb1 [verb1 options] then verb2 [verb2 options] ... [files]
//! ```
//!
//! Global options are parsed with clap. Everything from the first verb name
//! on is handed to the verb parsers; whatever the last verb leaves
//! unconsumed names the input files.

use std::io::{self, BufWriter, Write};

use clap::{ArgAction, CommandFactory, Parser};
use tracing::debug;

use crate::chain::DEFAULT_BATCH_SIZE;
use crate::error::{PipelineError, Result};
use crate::infer::{InferenceMode, install_inference_mode};
use crate::inplace;
use crate::input::{InputFormat, MemorySource, ReaderSource, Source};
use crate::output::{OutputFormat, SinkOptions};
use crate::stream::{StreamOptions, run_stream};
use crate::value::FloatFormat;
use crate::verb::{Verb, VerbConfig};
use crate::verbs::{leads_with_generator, list_verbs, parse_verb, verb_usage};

/// Concurrent streaming processor for keyed text records.
#[derive(Parser, Debug, Clone)]
#[command(name = "recflow", version)]
#[command(
    override_usage = "recflow [OPTIONS] {verb} [verb options] [then {verb} [verb options] ...] [FILES]..."
)]
#[command(after_help = "Use `recflow help verb {name}` or `recflow {name} --help` for verb usage.")]
pub struct Cli {
    /// Input format: dkvp, nidx, csv, tsv, json, pprint, xtab
    #[arg(short = 'i', long = "input-format", default_value = "dkvp")]
    pub input_format: String,

    /// Output format: dkvp, nidx, csv, json, pprint
    #[arg(short = 'o', long = "output-format", default_value = "dkvp")]
    pub output_format: String,

    /// Input field separator (names such as comma, tab, space are accepted)
    #[arg(long)]
    pub ifs: Option<String>,

    /// Input pair separator
    #[arg(long)]
    pub ips: Option<String>,

    /// Output field separator
    #[arg(long)]
    pub ofs: Option<String>,

    /// Output pair separator
    #[arg(long)]
    pub ops: Option<String>,

    /// Infer no types: every field value is a string
    #[arg(short = 'S', conflicts_with_all = ["int_as_float", "leading_zero_as_int"])]
    pub strings_only: bool,

    /// Infer ints as floats
    #[arg(short = 'A', conflicts_with = "leading_zero_as_int")]
    pub int_as_float: bool,

    /// Infer leading-zero numbers such as 0755 as ints (octal where possible)
    #[arg(short = 'O')]
    pub leading_zero_as_int: bool,

    /// Format for computed floats, e.g. %.6f, %.4lf, %.3e
    #[arg(long)]
    pub ofmt: Option<String>,

    /// Seed for shuffle and the random functions; decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Envelopes per batch between stages
    #[arg(long = "records-per-batch", default_value_t = DEFAULT_BATCH_SIZE)]
    pub records_per_batch: usize,

    /// Log progress every N input records
    #[arg(long = "nr-progress-mod", value_name = "N")]
    pub nr_progress_mod: Option<u64>,

    /// Stop with an error at the first error-valued field
    #[arg(long = "fail-on-data-error")]
    pub fail_on_data_error: bool,

    /// Read no input; useful with generators and end blocks
    #[arg(short = 'n')]
    pub no_input: bool,

    /// Rewrite each input file in place
    #[arg(short = 'I')]
    pub in_place: bool,

    /// Input file, used when none follow the chain; may be repeated
    #[arg(long = "from", value_name = "FILE")]
    pub from: Vec<String>,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// List verb names and exit
    #[arg(long = "list-verbs")]
    pub list_verbs: bool,

    /// Verb chain and input files
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "CHAIN")]
    pub chain: Vec<String>,
}

fn parse_seed(text: &str) -> std::result::Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("\"{text}\" is not a seed"))
}

/// Expand separator names such as `tab` and `comma`.
fn separator(name: &str) -> String {
    match name {
        "comma" => ",",
        "tab" => "\t",
        "space" => " ",
        "semicolon" => ";",
        "colon" => ":",
        "pipe" => "|",
        "equals" => "=",
        "newline" => "\n",
        other => other,
    }
    .to_string()
}

/// Everything needed to run a chain, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    pub ifs: Option<String>,
    pub ips: Option<String>,
    pub ofs: Option<String>,
    pub ops: Option<String>,
    pub ofmt: Option<FloatFormat>,
    pub inference: InferenceMode,
    pub verb_config: VerbConfig,
    pub stream: StreamOptions,
    pub progress_every: Option<u64>,
    pub no_input: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_format: InputFormat::Dkvp,
            output_format: OutputFormat::Dkvp,
            ifs: None,
            ips: None,
            ofs: None,
            ops: None,
            ofmt: None,
            inference: InferenceMode::Normal,
            verb_config: VerbConfig::default(),
            stream: StreamOptions::default(),
            progress_every: None,
            no_input: false,
        }
    }
}

impl Cli {
    pub fn settings(&self) -> Result<Settings> {
        if self.records_per_batch == 0 {
            return Err(PipelineError::Usage(
                "--records-per-batch must be at least 1".to_string(),
            ));
        }
        let inference = if self.strings_only {
            InferenceMode::StringOnly
        } else if self.int_as_float {
            InferenceMode::IntAsFloat
        } else if self.leading_zero_as_int {
            InferenceMode::LeadingZeroAsInt
        } else {
            InferenceMode::Normal
        };
        Ok(Settings {
            input_format: InputFormat::parse(&self.input_format)?,
            output_format: OutputFormat::parse(&self.output_format)?,
            ifs: self.ifs.as_deref().map(separator),
            ips: self.ips.as_deref().map(separator),
            ofs: self.ofs.as_deref().map(separator),
            ops: self.ops.as_deref().map(separator),
            ofmt: self.ofmt.as_deref().map(FloatFormat::parse).transpose()?,
            inference,
            verb_config: VerbConfig { seed: self.seed },
            stream: StreamOptions {
                batch_size: self.records_per_batch,
                sink: SinkOptions {
                    fail_on_data_error: self.fail_on_data_error,
                },
            },
            progress_every: self.nr_progress_mod,
            no_input: self.no_input,
        })
    }
}

/// Split the verb part of the command line on `then`.
pub fn split_chain(args: &[String]) -> Vec<Vec<String>> {
    args.split(|arg| arg == "then").map(<[String]>::to_vec).collect()
}

/// Construct every verb in `segments`. Only the last verb may leave
/// arguments unconsumed; those are returned as input names.
pub fn build_verbs(
    segments: &[Vec<String>],
    config: &VerbConfig,
) -> Result<(Vec<Box<dyn Verb>>, Vec<String>)> {
    let mut verbs = Vec::with_capacity(segments.len());
    let mut files = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let (verb, rest) = parse_verb(segment, config)?;
        if i + 1 == segments.len() {
            files = rest.to_vec();
        } else if let Some(extra) = rest.first() {
            return Err(PipelineError::verb(
                verb.name(),
                format!("unexpected argument \"{extra}\" (missing \"then\"?)"),
            ));
        }
        verbs.push(verb);
    }
    Ok((verbs, files))
}

/// Run freshly built `verbs` over `files` (or standard input), writing to
/// `out`. Returns the output stream.
pub fn run_verbs_to<W>(
    settings: &Settings,
    verbs: Vec<Box<dyn Verb>>,
    files: Vec<String>,
    reads_input: bool,
    out: W,
) -> Result<W>
where
    W: Write + Send + 'static,
{
    let source: Box<dyn Source> = if reads_input {
        let reader = settings
            .input_format
            .reader(settings.ifs.as_deref(), settings.ips.as_deref());
        Box::new(
            ReaderSource::new(reader, settings.stream.batch_size)
                .with_progress(settings.progress_every),
        )
    } else {
        Box::new(MemorySource::empty())
    };
    let writer = settings.output_format.writer(
        settings.ofs.as_deref(),
        settings.ops.as_deref(),
        settings.ofmt,
    );
    run_stream(source, files, verbs, writer, out, settings.stream)
}

/// Build and run `segments`, with `from` as the fallback input list.
pub fn run_chain_to<W>(
    settings: &Settings,
    segments: &[Vec<String>],
    from: &[String],
    out: W,
) -> Result<W>
where
    W: Write + Send + 'static,
{
    let (verbs, mut files) = build_verbs(segments, &settings.verb_config)?;
    if files.is_empty() {
        files = from.to_vec();
    }
    let reads_input = !settings.no_input && !leads_with_generator(segments);
    debug!(?files, reads_input, "chain built");
    run_verbs_to(settings, verbs, files, reads_input, out)
}

fn help(topic: &[String]) -> Result<()> {
    match topic {
        [kind, names @ ..] if kind == "verb" && !names.is_empty() => {
            for name in names {
                let usage =
                    verb_usage(name).ok_or_else(|| PipelineError::UnknownVerb(name.clone()))?;
                println!("{usage}");
            }
        }
        [kind] if kind == "verbs" || kind == "list-verbs" => {
            for name in list_verbs() {
                println!("{name}");
            }
        }
        _ => println!("{}", Cli::command().render_long_help()),
    }
    Ok(())
}

/// Carry out a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if cli.list_verbs {
        for name in list_verbs() {
            println!("{name}");
        }
        return Ok(());
    }
    if let Some((first, topic)) = cli.chain.split_first()
        && first == "help"
    {
        return help(topic);
    }
    if cli.chain.is_empty() {
        return Err(PipelineError::Usage(
            "no verb supplied; try \"recflow --help\"".to_string(),
        ));
    }

    let settings = cli.settings()?;
    install_inference_mode(settings.inference)?;
    let segments = split_chain(&cli.chain);

    if cli.in_place {
        return inplace::rewrite_files(&settings, &segments, &cli.from);
    }
    let out = BufWriter::new(io::stdout());
    run_chain_to(&settings, &segments, &cli.from, out)?;
    Ok(())
}

//! End-to-end runs through the command-line layer: files on disk, global
//! options, the concurrent chain and every writer.

use std::fs;
use std::path::Path;

use clap::Parser;
use recflow::PipelineError;
use recflow::cli::{Cli, run_chain_to, split_chain};

const EXAMPLE: &str = "\
color=yellow,shape=triangle,flag=true,k=1,index=11,quantity=43.6498,rate=9.8870
color=red,shape=square,flag=true,k=2,index=15,quantity=79.2778,rate=0.0130
color=red,shape=circle,flag=true,k=3,index=16,quantity=13.8103,rate=2.9010
color=red,shape=square,flag=false,k=4,index=48,quantity=77.5542,rate=7.4670
color=purple,shape=triangle,flag=false,k=5,index=51,quantity=81.2290,rate=8.5910
color=red,shape=square,flag=false,k=6,index=64,quantity=77.1991,rate=9.5310
color=purple,shape=triangle,flag=false,k=7,index=65,quantity=80.1405,rate=5.8240
color=yellow,shape=circle,flag=true,k=8,index=73,quantity=63.9785,rate=4.2370
color=yellow,shape=circle,flag=true,k=9,index=87,quantity=63.5058,rate=8.3350
color=purple,shape=square,flag=false,k=10,index=91,quantity=72.3735,rate=8.2430
";

fn write_example(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

/// Parse `args` as a full command line and run it, capturing output.
fn recflow(args: &[&str]) -> Result<String, PipelineError> {
    let cli = Cli::try_parse_from(std::iter::once("recflow").chain(args.iter().copied()))
        .map_err(|e| PipelineError::Usage(e.to_string()))?;
    let settings = cli.settings()?;
    let segments = split_chain(&cli.chain);
    let out = run_chain_to(&settings, &segments, &cli.from, Vec::new())?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_cat_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    assert_eq!(recflow(&["cat", &file]).unwrap(), EXAMPLE);
}

#[test]
fn test_head_then_sort() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    let out = recflow(&["head", "-n", "4", "then", "sort", "-nr", "quantity", "then", "cut", "-f", "k", &file])
        .unwrap();
    assert_eq!(out, "k=2\nk=4\nk=1\nk=3\n");
}

#[test]
fn test_filenames_and_context_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_example(dir.path(), "a.dkvp", "x=1\nx=2\n");
    let b = write_example(dir.path(), "b.dkvp", "x=3\n");
    let out = recflow(&["put", "$nr = NR; $fnr = FNR; $file = FILENUM", &a, &b]).unwrap();
    assert_eq!(
        out,
        "x=1,nr=1,fnr=1,file=1\nx=2,nr=2,fnr=2,file=1\nx=3,nr=3,fnr=1,file=2\n"
    );
}

#[test]
fn test_from_option() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    let out = recflow(&["--from", &file, "count", "-g", "shape"]).unwrap();
    assert_eq!(out, "shape=triangle,count=3\nshape=square,count=4\nshape=circle,count=3\n");
}

#[test]
fn test_csv_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "in.csv", "a,b\n1,x\n2,y\n");
    let out = recflow(&["-i", "csv", "-o", "json", "put", "$c = $a * 10", &file]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!([
            {"a": 1, "b": "x", "c": 10},
            {"a": 2, "b": "y", "c": 20},
        ])
    );
}

#[test]
fn test_pprint_output() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    let out = recflow(&["-o", "pprint", "head", "-n", "2", "then", "cut", "-f", "color,k", &file]).unwrap();
    assert_eq!(out, "color  k\nyellow 1\nred    2\n");
}

#[test]
fn test_generator_needs_no_input() {
    let out = recflow(&["seqgen", "--start", "1", "--stop", "5", "then", "put", "$y = $i ** 2"]).unwrap();
    assert_eq!(out, "i=1,y=1\ni=2,y=4\ni=3,y=9\ni=4,y=16\ni=5,y=25\n");
}

#[test]
fn test_ofmt_applies_to_computed_floats() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "in.dkvp", "x=0.123456789\n");
    let out = recflow(&["--ofmt", "%.3f", "put", "$y = $x * 2", &file]).unwrap();
    assert_eq!(out, "x=0.123456789,y=0.247\n");
}

#[test]
fn test_separator_names() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "in.dkvp", "a:1;b:2\n");
    let out = recflow(&["--ifs", "semicolon", "--ips", "colon", "--ofs", "tab", "cat", &file]).unwrap();
    assert_eq!(out, "a=1\tb=2\n");
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.dkvp");
    let err = recflow(&["cat", missing.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, PipelineError::Open { .. }), "{err}");
}

#[test]
fn test_data_error_reports_position() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "in.dkvp", "x=1\nx=abc\n");
    let out = recflow(&["put", "$y = $x + 1", &file]).unwrap();
    assert_eq!(out, "x=1,y=2\nx=abc,y=(error)\n");
    let err = recflow(&["--fail-on-data-error", "put", "$y = $x + 1", &file]).unwrap_err();
    match err {
        PipelineError::Data { nr, fnr, field, .. } => {
            assert_eq!((nr, fnr, field.as_str()), (2, 2, "y"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_bad_chains() {
    assert!(matches!(recflow(&["nosuchverb"]), Err(PipelineError::UnknownVerb(_))));
    assert!(matches!(recflow(&["cat", "then"]), Err(PipelineError::Usage(_))));
    assert!(matches!(recflow(&["head", "-n", "x"]), Err(PipelineError::Verb { .. })));
}

#[test]
fn test_small_batches_match_default() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    let chain = ["group-by", "color", "then", "head", "-n", "2", "-g", "shape", "then", "tac"];
    let mut small = vec!["--records-per-batch", "1"];
    small.extend(chain);
    small.push(&file);
    let mut default: Vec<&str> = chain.to_vec();
    default.push(&file);
    assert_eq!(recflow(&small).unwrap(), recflow(&default).unwrap());
}

#[test]
fn test_pprint_output_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_example(dir.path(), "example.dkvp", EXAMPLE);
    let table = recflow(&["-o", "pprint", "cut", "-f", "color,k", &file]).unwrap();
    let table_file = write_example(dir.path(), "table.txt", &table);
    let out = recflow(&["-i", "pprint", "head", "-n", "2", &table_file]).unwrap();
    assert_eq!(out, "color=yellow,k=1\ncolor=red,k=2\n");
}

#[test]
fn test_tsv_and_xtab_input() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = write_example(dir.path(), "in.tsv", "a\tb\n1\tx y\n");
    assert_eq!(recflow(&["-i", "tsv", "cat", &tsv]).unwrap(), "a=1,b=x y\n");
    let xtab = write_example(dir.path(), "in.xtab", "a 1\nb 2\n\na 3\nb 4\n");
    let out = recflow(&["-i", "xtab", "put", "$c = $a + $b", &xtab]).unwrap();
    assert_eq!(out, "a=1,b=2,c=3\na=3,b=4,c=7\n");
}

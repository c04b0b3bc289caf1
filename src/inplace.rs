//! In-place mode (`-I`): each file is run through its own fresh chain into a
//! temporary file beside it, which then replaces the original.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::cli::{Settings, build_verbs, run_verbs_to};
use crate::error::{PipelineError, Result};
use crate::verbs::leads_with_generator;

/// Rewrite every input file named after the chain (or by `--from`).
pub fn rewrite_files(settings: &Settings, segments: &[Vec<String>], from: &[String]) -> Result<()> {
    let (_, mut files) = build_verbs(segments, &settings.verb_config)?;
    if files.is_empty() {
        files = from.to_vec();
    }
    if files.is_empty() {
        return Err(PipelineError::Usage("-I requires input file names".to_string()));
    }
    if settings.no_input || leads_with_generator(segments) {
        return Err(PipelineError::Usage(
            "-I cannot be used when no input is read".to_string(),
        ));
    }
    for file in &files {
        rewrite_file(settings, segments, file)?;
    }
    Ok(())
}

fn rewrite_file(settings: &Settings, segments: &[Vec<String>], file: &str) -> Result<()> {
    let path = Path::new(file);
    let open_error = |source| PipelineError::Open {
        path: file.to_string(),
        source,
    };
    let permissions = fs::metadata(path).map_err(open_error)?.permissions();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(|source| PipelineError::Open {
        path: dir.display().to_string(),
        source,
    })?;

    let (verbs, _) = build_verbs(segments, &settings.verb_config)?;
    let out = run_verbs_to(settings, verbs, vec![file.to_string()], true, BufWriter::new(temp))?;
    let temp = out
        .into_inner()
        .map_err(|e| PipelineError::Write(e.into_error()))?;

    temp.as_file()
        .set_permissions(permissions)
        .map_err(PipelineError::Write)?;
    temp.persist(path).map_err(|e| PipelineError::Write(e.error))?;
    info!(file, "rewrote in place");
    Ok(())
}

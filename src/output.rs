//! Output artifacts: the map file, the exclusion report, and run statistics.
//!
//! Naming is deterministic — `{MMM}{YYYY}_{issuer}_{source-stem}.txt` — so
//! re-running a conversion for the same period and source overwrites the
//! previous artifact instead of littering the output directory, and an
//! operator can tell from a directory listing which upload a file belongs
//! to. The exclusion report shares the stem with an `_exclusoes` suffix and
//! is written only when at least one record was excluded: an absent report
//! *is* the signal that nothing was dropped.

use crate::config::ConversionConfig;
use crate::error::SiproquimError;
use crate::model::ExclusionEntry;
use crate::pipeline::encode::PositionalLine;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Counters for one conversion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    /// Raw records recognised in the PDF.
    pub extracted: usize,
    /// Records dropped as in-batch duplicates.
    pub duplicates: usize,
    /// Records encoded into the map file.
    pub accepted: usize,
    /// Records excluded by validation.
    pub excluded: usize,
    /// Blank party names repaired from the branch directory.
    pub corrected: usize,
    /// Total positional lines written, header included.
    pub lines: usize,
    /// Wall-clock milliseconds for the whole run.
    pub duration_ms: u64,
}

/// Everything a conversion produced, before anything touches disk.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The complete positional file text, trailing newline included.
    pub file_text: String,
    /// The rendered lines, for callers that post-inspect columns.
    pub lines: Vec<PositionalLine>,
    /// Rejected records in input order.
    pub exclusions: Vec<ExclusionEntry>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Human-readable exclusion report, or `None` when nothing was excluded.
    pub fn exclusion_report(&self, config: &ConversionConfig) -> Option<String> {
        if self.exclusions.is_empty() {
            return None;
        }
        let mut out = String::new();
        out.push_str("RELATORIO DE EXCLUSOES - MAPA SIPROQUIM\n");
        out.push_str(&format!("Periodo: {}\n", config.period));
        out.push_str(&format!("Registros excluidos: {}\n\n", self.exclusions.len()));
        for entry in &self.exclusions {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        Some(out)
    }
}

/// Deterministic map-file name for a period, issuer and source document.
pub fn map_file_name(config: &ConversionConfig, source: &Path) -> String {
    format!(
        "{}{}_{}_{}.txt",
        config.period.month_code(),
        config.period.year,
        config.issuer_id,
        source_stem(source),
    )
}

/// Exclusion-report name: the map name with an `_exclusoes` suffix.
pub fn exclusion_file_name(config: &ConversionConfig, source: &Path) -> String {
    format!(
        "{}{}_{}_{}_exclusoes.txt",
        config.period.month_code(),
        config.period.year,
        config.issuer_id,
        source_stem(source),
    )
}

/// Source file stem reduced to a filesystem-safe slug: ASCII alphanumerics
/// kept, everything else collapsed to single hyphens.
fn source_stem(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut slug = String::with_capacity(stem.len());
    let mut last_hyphen = true;
    for c in deunicode::deunicode(&stem).chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "documento".to_string()
    } else {
        slug
    }
}

/// Write a text artifact atomically: temp file in the target directory, then
/// rename. A crashed run leaves either the old artifact or the new one,
/// never a half-written file an operator could upload by mistake.
pub fn write_atomic(path: &Path, text: &str) -> Result<(), SiproquimError> {
    let io_err = |source| SiproquimError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let tmp: PathBuf = path.with_extension("txt.tmp");
    fs::write(&tmp, text).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), bytes = text.len(), "artifact written");
    Ok(())
}
